//! Error types for authentication, querying and flattening
//!
//! Every failure the tool can hit is a variant of [`QueryError`]. Library code
//! only returns these; deciding to terminate the process is left to the binaries.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while talking to the API or writing results
#[derive(Debug, Error)]
pub enum QueryError {
    /// The session endpoint answered with anything other than 200
    #[error("login failed, check the credentials (HTTP {status})")]
    AuthenticationFailed { status: u16 },

    /// Query parameters were not given as key/value pairs
    #[error("got query parameters: {params}, but expecting even length list: key1 value1 key2 value2...")]
    OddParameterList { params: String },

    /// Arguments that do not describe a runnable invocation
    #[error("usage error: {0}")]
    Usage(String),

    #[error("invalid query type: {0}")]
    InvalidQueryType(String),

    /// The server replied with a `status` other than `success`
    #[error("getting items for {query_type} failed, params: {params}, error: {message}")]
    QueryFailed {
        query_type: String,
        params: String,
        message: String,
    },

    /// A successful reply was missing a field the protocol requires
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("stopped after {0} pages without reaching the last one")]
    PageLimitReached(usize),

    #[error("download link still not ready after {0} status checks")]
    PollLimitReached(usize),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write delimited output: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot flatten input: {0}")]
    Flatten(String),
}

impl QueryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
