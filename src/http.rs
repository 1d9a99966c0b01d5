//! HTTP client for the Orca REST API
//!
//! Thin wrapper over a configured `reqwest::Client` that knows the API base URL
//! and the two request shapes the tool uses:
//! - form-encoded POST for the session endpoint
//! - authenticated GET returning a JSON body for query and status endpoints
//!
//! No retries happen here. Transport errors and non-JSON bodies surface as
//! [`QueryError::Http`].

use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use tracing::debug;

use crate::auth::Credential;
use crate::error::{QueryError, Result};
use crate::validation::QueryParams;

/// HTTP client bound to one API base URL
///
/// # Examples
///
/// ```
/// use orca_query::http::ApiClient;
/// use std::time::Duration;
///
/// # fn example() -> orca_query::error::Result<()> {
/// let client = ApiClient::new("https://api.orcasecurity.io/api/", Some(Duration::from_secs(10)))?;
/// assert_eq!(client.endpoint("query/alerts"), "https://api.orcasecurity.io/api/query/alerts");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url`
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.orcasecurity.io/api`
    /// * `timeout` - Per-request timeout; `None` leaves requests unbounded
    ///
    /// # Returns
    /// * `Result<Self>` - A configured client or error if the TLS backend failed to initialize
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ClientBuilder::new();
        // reqwest applies no timeout unless one is set
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .user_agent(concat!("orca-query/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a form-encoded POST and hands back the raw response
    ///
    /// The caller decides what a non-success status means.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Response> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self.client.post(&url).form(form).send().await?;

        debug!("POST {} -> {}", url, response.status());
        Ok(response)
    }

    /// Sends an authenticated GET and decodes the JSON body
    ///
    /// The HTTP status is not inspected: the API reports failures in the body's
    /// `status` field, which the caller checks.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
        params: &QueryParams,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!("GET {} params={}", url, params);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, credential.authorization_header())
            .query(params.as_pairs())
            .send()
            .await?;

        debug!("GET {} -> {}", url, response.status());
        response.json::<T>().await.map_err(QueryError::from)
    }
}
