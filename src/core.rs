//! Query execution against the Orca REST API
//!
//! This module drives the retrieval protocol:
//! - Paged export: fetch fixed-size pages, following `next_page_token` until the
//!   server stops returning one, then write everything to a JSON file
//! - Download link: ask the server to build the result file asynchronously and
//!   poll the status endpoint until it reports the file location
//!
//! Both loops run until the server gives a terminal signal unless a cap is set
//! in [`ClientConfig`]. Waiting between polls goes through the [`Sleeper`] trait
//! so tests can observe it without real delays.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::{
    auth::{authenticate, AuthMethod, Credential},
    config::ClientConfig,
    error::{QueryError, Result},
    http::ApiClient,
    sanitize::{describe_server_error, sanitize_server_text},
    validation::{parse_query_params, validate_query_type, QueryParams},
};

const STATUS_PATH: &str = "query/status/";
const SUCCESS: &str = "success";

/// Suspends the caller between download-status polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A query against one resource collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Resource collection name, e.g. `alerts` or `assets`
    pub query_type: String,
    /// Caller-supplied filters, passed through untouched
    pub params: QueryParams,
}

impl QueryRequest {
    pub fn new(query_type: impl Into<String>, params: QueryParams) -> Result<Self> {
        let query_type = query_type.into();
        validate_query_type(&query_type)?;
        Ok(Self { query_type, params })
    }

    /// Builds a request from command-line `key value` tokens
    pub fn from_tokens(query_type: &str, tokens: &[String]) -> Result<Self> {
        Self::new(query_type, parse_query_params(tokens)?)
    }

    fn path(&self) -> String {
        format!("query/{}", self.query_type)
    }
}

/// Everything retrieved by a paged export
///
/// Serializes as the bare `data` payload so the output file mirrors the
/// server's shape: an array of records, or a single object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    /// Records accumulated across pages, in order
    Records(Vec<Value>),
    /// A non-array `data` payload; replaces anything accumulated before it
    Object(Value),
}

impl QueryResult {
    pub fn record_count(&self) -> usize {
        match self {
            QueryResult::Records(records) => records.len(),
            QueryResult::Object(_) => 1,
        }
    }

    fn absorb(current: Option<Self>, chunk: Value) -> Self {
        match (current, chunk) {
            (Some(QueryResult::Records(mut records)), Value::Array(items)) => {
                records.extend(items);
                QueryResult::Records(records)
            }
            (_, Value::Array(items)) => QueryResult::Records(items),
            (_, other) => QueryResult::Object(other),
        }
    }
}

/// Result of following a paged query to its last page
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult {
    pub data: QueryResult,
    /// Last `total_items` figure the server reported, if any
    pub total_items: Option<u64>,
    /// Number of page requests issued
    pub pages: usize,
}

/// Where the results of an invocation go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Page through everything and write it to this JSON file
    File(PathBuf),
    /// Have the server prepare a downloadable file and report its location
    DownloadLink,
}

/// One complete run of the tool
#[derive(Debug, Clone)]
pub struct Invocation {
    pub auth: AuthMethod,
    pub query_type: String,
    /// Flat `key value key value ...` tokens
    pub query_params: Vec<String>,
    pub output: OutputMode,
}

/// What a successful invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Written { path: PathBuf, records: usize },
    DownloadLink(String),
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    // `Some(Value::Null)` for an explicit null, `None` when the key is missing
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    total_items: Option<Value>,
    #[serde(default)]
    next_page_token: Option<Value>,
    #[serde(default)]
    request_token: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    query_status: Option<String>,
    #[serde(default)]
    file_location: Option<String>,
}

/// Opaque server token as a string; null and empty mean "no token"
fn token_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Display form of a non-terminal status, safe for the console
fn pending_status(status: &StatusResponse) -> String {
    status
        .query_status
        .as_deref()
        .map(sanitize_server_text)
        .unwrap_or_else(|| "unknown".to_string())
}

fn ensure_success(query_type: &str, params: &QueryParams, response: QueryResponse) -> Result<QueryResponse> {
    if response.status == SUCCESS {
        return Ok(response);
    }

    let message = describe_server_error(response.error.as_ref());
    warn!("Query {} returned status {}", query_type, sanitize_server_text(&response.status));
    Err(QueryError::QueryFailed {
        query_type: query_type.to_string(),
        params: params.to_string(),
        message,
    })
}

/// Runs queries against the API
///
/// # Examples
///
/// ```no_run
/// use orca_query::auth::Credential;
/// use orca_query::config::ClientConfig;
/// use orca_query::core::{QueryExecutor, QueryRequest};
/// use orca_query::validation::QueryParams;
///
/// # async fn example() -> orca_query::error::Result<()> {
/// let executor = QueryExecutor::new(ClientConfig::default())?;
/// let credential = Credential::ApiKey("my-api-key".to_string());
/// let request = QueryRequest::new("alerts", QueryParams::new())?;
///
/// let summary = executor.export_to_file(&credential, &request, "alerts.json".as_ref()).await?;
/// println!("wrote {} records", summary.data.record_count());
/// # Ok(())
/// # }
/// ```
pub struct QueryExecutor {
    client: ApiClient,
    config: ClientConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl QueryExecutor {
    /// Creates an executor with the production sleeper
    ///
    /// # Arguments
    /// * `config` - Base URL, page size, poll interval and optional caps
    ///
    /// # Returns
    /// * `Result<Self>` - New executor, or error if the HTTP client could not be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(&config.base_url, config.timeout)?,
            config,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replaces the sleeper used between download-status polls
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticates, builds the request, and runs it in the chosen output mode
    ///
    /// A failed login returns before any query request is sent. Malformed
    /// parameters are rejected before the query request as well.
    ///
    /// # Arguments
    /// * `invocation` - Credentials, query type, raw parameter tokens and output mode
    ///
    /// # Returns
    /// * `Result<QueryOutcome>` - The written file or the download location
    pub async fn execute(&self, invocation: &Invocation) -> Result<QueryOutcome> {
        // Login comes first, as in the interactive flow
        let credential = authenticate(&self.client, &invocation.auth).await?;
        let request = QueryRequest::from_tokens(&invocation.query_type, &invocation.query_params)?;

        match &invocation.output {
            OutputMode::File(path) => {
                let summary = self.export_to_file(&credential, &request, path).await?;
                Ok(QueryOutcome::Written {
                    path: path.clone(),
                    records: summary.data.record_count(),
                })
            }
            OutputMode::DownloadLink => {
                let location = self.request_download_link(&credential, &request).await?;
                Ok(QueryOutcome::DownloadLink(location))
            }
        }
    }

    /// Fetches every page of a query
    ///
    /// Array pages are appended in order. A non-array `data` payload replaces
    /// whatever was accumulated. Paging stops on the first response without a
    /// `next_page_token`.
    ///
    /// # Arguments
    /// * `credential` - Bearer token or API key for the `Authorization` header
    /// * `request` - Query type and caller filters
    ///
    /// # Returns
    /// * `Result<PagedResult>` - Accumulated data, last reported total and page count
    pub async fn fetch_all(&self, credential: &Credential, request: &QueryRequest) -> Result<PagedResult> {
        let path = request.path();

        // Caller filters plus the page size; the continuation token joins later
        let mut params = request.params.clone();
        params.set("limit", self.config.page_size.to_string());

        let mut data = None;
        let mut total_items = None;
        let mut pages = 0usize;

        loop {
            let response: QueryResponse = self.client.get_json(&path, credential, &params).await?;
            pages += 1;
            let mut response = ensure_success(&request.query_type, &params, response)?;

            let chunk = response.data.take().ok_or_else(|| {
                QueryError::MalformedResponse(format!("page {} of {} has no data field", pages, request.query_type))
            })?;
            let result = QueryResult::absorb(data.take(), chunk);

            // total_items is only used for progress output
            if let Some(total) = response.total_items.as_ref().and_then(Value::as_u64) {
                total_items = Some(total);
            }
            match total_items {
                Some(total) => info!("Got {}/{} items", result.record_count(), total),
                None => info!("Got {} items", result.record_count()),
            }
            data = Some(result);

            // No token means this was the last page
            let Some(token) = token_value(response.next_page_token.take()) else {
                break;
            };
            if self.config.max_pages.is_some_and(|max| pages >= max) {
                return Err(QueryError::PageLimitReached(pages));
            }
            debug!("Continuing with next page token");
            params.set("next_page_token", token);
        }

        Ok(PagedResult {
            data: data.unwrap_or(QueryResult::Records(Vec::new())),
            total_items,
            pages,
        })
    }

    /// Fetches every page and writes the result to `path` as indented JSON
    ///
    /// The file is only created once all pages have been retrieved.
    ///
    /// # Arguments
    /// * `credential` - Bearer token or API key
    /// * `request` - Query type and caller filters
    /// * `path` - JSON file to create or overwrite
    ///
    /// # Returns
    /// * `Result<PagedResult>` - What was written
    pub async fn export_to_file(&self, credential: &Credential, request: &QueryRequest, path: &Path) -> Result<PagedResult> {
        let result = self.fetch_all(credential, request).await?;

        let json = serde_json::to_string_pretty(&result.data)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| QueryError::io(path, e))?;

        info!(
            "Wrote {} records from {} pages to {}",
            result.data.record_count(),
            result.pages,
            path.display()
        );
        Ok(result)
    }

    /// Requests an asynchronously generated download and waits for its location
    ///
    /// # Arguments
    /// * `credential` - Bearer token or API key
    /// * `request` - Query type and caller filters
    ///
    /// # Returns
    /// * `Result<String>` - The server-provided file location
    pub async fn request_download_link(&self, credential: &Credential, request: &QueryRequest) -> Result<String> {
        let mut params = request.params.clone();
        params.set("get_download_link", "True");
        params.set("download_async", "True");

        let response: QueryResponse = self.client.get_json(&request.path(), credential, &params).await?;
        let response = ensure_success(&request.query_type, &params, response)?;

        let request_token = token_value(response.request_token).ok_or_else(|| {
            QueryError::MalformedResponse(format!("download request for {} returned no request_token", request.query_type))
        })?;

        info!("Download requested, waiting for the file to be ready");
        self.wait_for_download(credential, &request_token).await
    }

    /// Polls the status endpoint until the download is ready
    ///
    /// Sleeps `poll_interval` after every poll that is not yet `success`.
    ///
    /// # Arguments
    /// * `credential` - Bearer token or API key, sent with every poll
    /// * `request_token` - Token returned by the download request
    ///
    /// # Returns
    /// * `Result<String>` - The file location from the first `success` poll
    pub async fn wait_for_download(&self, credential: &Credential, request_token: &str) -> Result<String> {
        let mut params = QueryParams::new();
        params.set("request_token", request_token);

        let mut polls = 0usize;
        loop {
            let status: StatusResponse = self.client.get_json(STATUS_PATH, credential, &params).await?;
            polls += 1;

            if status.query_status.as_deref() == Some(SUCCESS) {
                let location = status.file_location.ok_or_else(|| {
                    QueryError::MalformedResponse("ready download has no file_location".to_string())
                })?;
                info!("Download ready after {} status checks", polls);
                return Ok(location);
            }

            if self.config.max_polls.is_some_and(|max| polls >= max) {
                return Err(QueryError::PollLimitReached(polls));
            }

            debug!(
                "Query status is {}, checking again in {:?}",
                pending_status(&status),
                self.config.poll_interval
            );
            self.sleeper.sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absorb_appends_arrays_in_order() {
        let first = QueryResult::absorb(None, json!([1, 2]));
        let second = QueryResult::absorb(Some(first), json!([3]));
        assert_eq!(second, QueryResult::Records(vec![json!(1), json!(2), json!(3)]));
    }

    #[test]
    fn test_absorb_object_overwrites() {
        let records = QueryResult::absorb(None, json!([{"id": 1}]));
        let object = QueryResult::absorb(Some(records), json!({"count": 7}));
        assert_eq!(object, QueryResult::Object(json!({"count": 7})));

        let restarted = QueryResult::absorb(Some(object), json!([{"id": 2}]));
        assert_eq!(restarted, QueryResult::Records(vec![json!({"id": 2})]));
    }

    #[test]
    fn test_token_value() {
        assert_eq!(token_value(Some(json!("abc"))), Some("abc".to_string()));
        assert_eq!(token_value(Some(json!(42))), Some("42".to_string()));
        assert_eq!(token_value(Some(json!(""))), None);
        assert_eq!(token_value(Some(Value::Null)), None);
        assert_eq!(token_value(None), None);
    }

    #[test]
    fn test_missing_and_null_data_are_distinct() {
        let missing: QueryResponse = serde_json::from_value(json!({"status": "success"})).unwrap();
        assert!(missing.data.is_none());

        let null: QueryResponse = serde_json::from_value(json!({"status": "success", "data": null})).unwrap();
        assert_eq!(null.data, Some(Value::Null));
    }

    #[test]
    fn test_pending_status_is_sanitized() {
        let status: StatusResponse =
            serde_json::from_value(json!({"query_status": "running\u{1b}[2J\n"})).unwrap();
        assert_eq!(pending_status(&status), "running[2J");

        let missing: StatusResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(pending_status(&missing), "unknown");
    }

    #[test]
    fn test_query_type_is_validated() {
        assert!(QueryRequest::from_tokens("alerts", &[]).is_ok());
        assert!(QueryRequest::from_tokens("../user", &[]).is_err());
        assert!(QueryRequest::from_tokens("", &[]).is_err());
    }
}
