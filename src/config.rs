//! Client configuration for Orca API queries
//!
//! Holds the handful of knobs the query client needs: where the API lives,
//! how large each page is, how long to wait between download-status polls,
//! and optional caps on the paging and polling loops. The defaults reproduce
//! the production behavior of the tool, which never gives up on its own.

use std::time::Duration;

/// Default Orca REST API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.orcasecurity.io/api";

/// Records requested per page when exporting to a file
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Seconds between download-status polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Configuration shared by the authenticator and the query executor
///
/// # Examples
///
/// ```
/// use orca_query::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://127.0.0.1:8080/api")
///     .with_poll_interval(Duration::from_millis(10))
///     .with_max_polls(3);
///
/// assert_eq!(config.page_size, 500);
/// assert_eq!(config.max_polls, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL, without the `/query` suffix
    pub base_url: String,

    /// Records per page in file-export mode (1..=1000)
    pub page_size: u32,

    /// Wait between status polls in download-link mode
    pub poll_interval: Duration,

    /// HTTP request timeout; `None` waits as long as the server takes
    pub timeout: Option<Duration>,

    /// Stop paging after this many requests; `None` pages until the server stops
    pub max_pages: Option<usize>,

    /// Stop polling after this many status checks; `None` polls until ready
    pub max_polls: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: None,
            max_pages: None,
            max_polls: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the page size, clamped into the range the API accepts
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_max_polls(mut self, max_polls: usize) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_behavior() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.page_size, 500);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.timeout.is_none());
        assert!(config.max_pages.is_none());
        assert!(config.max_polls.is_none());
    }

    #[test]
    fn test_timeout_is_opt_in() {
        let config = ClientConfig::default().with_timeout(Duration::from_secs(30));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(ClientConfig::default().with_page_size(0).page_size, 1);
        assert_eq!(ClientConfig::default().with_page_size(5000).page_size, MAX_PAGE_SIZE);
        assert_eq!(ClientConfig::default().with_page_size(250).page_size, 250);
    }
}
