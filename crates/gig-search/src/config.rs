//! Search engine connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result, RetryConfig};

// Default values
const DEFAULT_URL: &str = "http://localhost:9200";
const DEFAULT_INDEX: &str = "gigs";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Configuration for the search engine client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SearchConfig {
    /// Base URL of the search engine HTTP API
    #[cfg_attr(
        feature = "config",
        arg(long = "elastic-search-url", env = "ELASTIC_SEARCH_URL", default_value = DEFAULT_URL)
    )]
    pub elastic_search_url: String,

    /// Name of the index that must exist before the service listens
    #[cfg_attr(
        feature = "config",
        arg(long = "search-index", env = "SEARCH_INDEX", default_value = DEFAULT_INDEX)
    )]
    pub search_index: String,

    /// Timeout in seconds for a single HTTP request
    #[cfg_attr(
        feature = "config",
        arg(long = "search-request-timeout", env = "SEARCH_REQUEST_TIMEOUT_SECS")
    )]
    pub search_request_timeout: Option<u64>,

    /// Number of connectivity attempts before the check gives up
    #[cfg_attr(
        feature = "config",
        arg(long = "search-connect-attempts", env = "SEARCH_CONNECT_ATTEMPTS")
    )]
    pub search_connect_attempts: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl SearchConfig {
    /// Create a new configuration for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            elastic_search_url: url.into(),
            search_index: DEFAULT_INDEX.to_owned(),
            search_request_timeout: None,
            search_connect_attempts: None,
        }
    }

    /// Set the index name.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.search_index = index.into();
        self
    }

    /// Set the number of connectivity attempts.
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.search_connect_attempts = Some(attempts);
        self
    }

    /// Returns the per-request timeout.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.search_request_timeout
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Returns the number of connectivity attempts.
    #[inline]
    pub fn connect_attempts(&self) -> u32 {
        self.search_connect_attempts
            .unwrap_or(DEFAULT_CONNECT_ATTEMPTS)
    }

    /// Returns the retry policy of the connectivity check.
    pub fn connect_retry(&self) -> RetryConfig {
        RetryConfig::new(self.connect_attempts().saturating_sub(1), INITIAL_BACKOFF)
            .with_max_backoff(MAX_BACKOFF)
    }

    /// Parses the base URL, normalized so relative joins append to its path.
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.elastic_search_url.trim())
            .map_err(|e| Error::invalid_config(format!("search URL: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_config(
                "search URL must use http:// or https://",
            ));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        let index = self.search_index.as_str();
        if index.is_empty() {
            return Err(Error::invalid_config("index name cannot be empty"));
        }
        if index.starts_with(['_', '-', '+'])
            || index.contains(['/', '\\', '*', '?', '"', '<', '>', '|', ' ', ',', '#'])
            || index.chars().any(char::is_uppercase)
        {
            return Err(Error::invalid_config(format!(
                "'{index}' is not a valid index name"
            )));
        }

        if self.connect_attempts() == 0 {
            return Err(Error::invalid_config(
                "connect attempts must be at least 1",
            ));
        }

        Ok(())
    }
}
