//! Broker connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, RetryConfig};

// Default values
const DEFAULT_URL: &str = "nats://localhost:4222";
const DEFAULT_NAME: &str = "gig-service";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_RECONNECTS: usize = 10;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 2;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Configuration for the broker connection with sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct QueueConfig {
    /// NATS server URL (comma-separated for clustering)
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-url", env = "NATS_URL", default_value = DEFAULT_URL)
    )]
    pub nats_url: String,

    /// Authentication token
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Client connection name for debugging and monitoring
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// Connection timeout in seconds for a single attempt
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout", env = "NATS_CONNECT_TIMEOUT_SECS")
    )]
    pub nats_connect_timeout: Option<u64>,

    /// Number of connection attempts before startup gives up
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-attempts", env = "NATS_CONNECT_ATTEMPTS")
    )]
    pub nats_connect_attempts: Option<u32>,

    /// Maximum number of reconnection attempts once connected (0 = unlimited)
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-max-reconnects", env = "NATS_MAX_RECONNECTS")
    )]
    pub nats_max_reconnects: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl QueueConfig {
    /// Create a new configuration for the given server URL(s).
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            nats_url: server_url.into(),
            nats_token: None,
            nats_client_name: None,
            nats_connect_timeout: None,
            nats_connect_attempts: None,
            nats_max_reconnects: None,
        }
    }

    /// Returns the client name, using the default if not set.
    #[inline]
    pub fn name(&self) -> &str {
        self.nats_client_name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Returns the authentication token when one is configured.
    #[inline]
    pub fn token(&self) -> Option<&str> {
        self.nats_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Returns the server URLs (splits comma-separated URLs).
    pub fn servers(&self) -> Vec<&str> {
        self.nats_url.split(',').map(str::trim).collect()
    }

    /// Returns the timeout of a single connection attempt.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.nats_connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Returns the reconnect delay as a Duration.
    #[inline]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS)
    }

    /// Returns the ping interval as a Duration.
    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)
    }

    /// Returns the max reconnects as Option (0 means unlimited).
    #[inline]
    pub fn max_reconnects_option(&self) -> Option<usize> {
        let max = self.nats_max_reconnects.unwrap_or(DEFAULT_MAX_RECONNECTS);
        if max == 0 { None } else { Some(max) }
    }

    /// Returns the retry policy used while acquiring the initial connection.
    pub fn connect_retry(&self) -> RetryConfig {
        let attempts = self
            .nats_connect_attempts
            .unwrap_or(DEFAULT_CONNECT_ATTEMPTS);
        RetryConfig::new(attempts.saturating_sub(1), Duration::from_millis(500))
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    /// Set the client connection name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = Some(name.into());
        self
    }

    /// Set the number of initial connection attempts.
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.nats_connect_attempts = Some(attempts);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for server in self.servers() {
            if server.is_empty() {
                return Err(Error::invalid_config("server URL cannot be empty"));
            }
            if !server.starts_with("nats://") && !server.starts_with("tls://") {
                return Err(Error::invalid_config(format!(
                    "invalid server URL format: {server}"
                )));
            }
        }

        if self.nats_connect_attempts == Some(0) {
            return Err(Error::invalid_config(
                "at least one connection attempt is required",
            ));
        }

        Ok(())
    }
}
