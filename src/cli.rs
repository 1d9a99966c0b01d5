//! Command-line interfaces for the Orca query tools
//!
//! Two binaries share this module:
//! - `orca-query`: authenticate, run one query, and either write the results
//!   to a JSON file or print an asynchronously prepared download link
//! - `json-to-csv`: flatten a JSON export into a delimiter-separated file
//!
//! # Argument Rules
//!
//! All combination checks happen while parsing, before any network call:
//! - exactly one credential: `--email` with `--password`, or `--api-token`
//! - exactly one output mode: `--output-file` or `--output-download-link`
//!
//! Query parameters follow the flags as a flat `key value key value ...` list.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::AuthMethod;
use crate::config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_SECS,
};
use crate::core::{Invocation, OutputMode};
use crate::error::{QueryError, Result};
use crate::flatten::{DEFAULT_INPUT, DEFAULT_OUTPUT, DEFAULT_SEPARATOR};

/// Arguments of the `orca-query` binary
///
/// # Examples
///
/// ```text
/// orca-query --api-token $ORCA_TOKEN -q alerts -o alerts.json state.status open
/// orca-query --email me@example.com --password secret -q assets --output-download-link
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "orca-query",
    about = "Query the Orca Security API and save the results",
    version
)]
#[command(group(ArgGroup::new("credentials").required(true).args(["email", "api_token"])))]
#[command(group(ArgGroup::new("output").required(true).args(["output_file", "output_download_link"])))]
pub struct Cli {
    /// Base URL of the API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Account email (requires --password)
    #[arg(long, requires = "password")]
    pub email: Option<String>,

    /// Account password (requires --email)
    #[arg(long, requires = "email")]
    pub password: Option<String>,

    /// API token, used instead of email and password
    #[arg(long, conflicts_with_all = ["email", "password"])]
    pub api_token: Option<String>,

    /// Resource collection to query (e.g. alerts, assets)
    #[arg(short = 'q', long)]
    pub query_type: String,

    /// Page through all results and write them to this JSON file
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Ask the server for a download link instead of paging
    #[arg(long)]
    pub output_download_link: bool,

    /// Records per page when writing to a file
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: u32,

    /// Seconds to wait between download status checks
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in milliseconds (default: no timeout)
    #[arg(short = 't', long)]
    pub timeout_ms: Option<u64>,

    /// Give up after this many pages (default: follow the server until the last page)
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Give up after this many status checks (default: wait until ready)
    #[arg(long)]
    pub max_polls: Option<usize>,

    /// Log request details
    #[arg(short, long)]
    pub verbose: bool,

    /// Query parameters as key value pairs: key1 value1 key2 value2 ...
    #[arg(value_name = "QUERY_PARAMS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub query_params: Vec<String>,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_base_url(self.api_url.as_str())
            .with_page_size(self.page_size)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs));
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(max_pages) = self.max_pages {
            config = config.with_max_pages(max_pages);
        }
        if let Some(max_polls) = self.max_polls {
            config = config.with_max_polls(max_polls);
        }
        config
    }

    pub fn auth_method(&self) -> Result<AuthMethod> {
        match (&self.email, &self.password, &self.api_token) {
            (Some(email), Some(password), None) => Ok(AuthMethod::Login {
                email: email.clone(),
                password: password.clone(),
            }),
            (None, None, Some(token)) => Ok(AuthMethod::ApiToken(token.clone())),
            _ => Err(QueryError::Usage(
                "use either --email and --password, or --api-token".to_string(),
            )),
        }
    }

    pub fn output_mode(&self) -> Result<OutputMode> {
        match (&self.output_file, self.output_download_link) {
            (Some(path), false) => Ok(OutputMode::File(path.clone())),
            (None, true) => Ok(OutputMode::DownloadLink),
            _ => Err(QueryError::Usage(
                "use either --output-file or --output-download-link".to_string(),
            )),
        }
    }

    pub fn invocation(&self) -> Result<Invocation> {
        Ok(Invocation {
            auth: self.auth_method()?,
            query_type: self.query_type.clone(),
            query_params: self.query_params.clone(),
            output: self.output_mode()?,
        })
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Arguments of the `json-to-csv` binary
#[derive(Parser, Debug)]
#[command(
    name = "json-to-csv",
    about = "Flatten nested JSON query results into a delimiter-separated file",
    version
)]
pub struct FlattenCli {
    /// JSON file produced by orca-query --output-file
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Delimited file to write
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Field separator
    #[arg(short, long, default_value_t = DEFAULT_SEPARATOR)]
    pub separator: char,
}
