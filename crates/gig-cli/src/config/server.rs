//! HTTP listener configuration and the startup policy.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Result as AnyhowResult, anyhow};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// What the lifecycle controller does when queue startup, search readiness
/// or the listener bind fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    /// Log the failure and keep starting up.
    #[default]
    Continue,
    /// Stop at the first failure and exit with status 1.
    Terminate,
}

/// HTTP listener configuration.
///
/// # Environment Variables
///
/// - `HOST` - address to bind (default: 0.0.0.0)
/// - `PORT` - port to bind (default: 4004)
/// - `SHUTDOWN_TIMEOUT` - seconds to wait for consumers on shutdown (default: 30)
/// - `STARTUP_POLICY` - `continue` or `terminate` (default: continue)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address to bind the server to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// TCP port number for the server to listen on.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 4004)]
    pub port: u16,

    /// Maximum time in seconds to wait for graceful shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 30)]
    pub shutdown_timeout: u64,

    /// Reaction to a failed queue, search or bind step.
    #[arg(long, env = "STARTUP_POLICY", value_enum, default_value_t = StartupPolicy::Continue)]
    #[serde(default)]
    pub startup_policy: StartupPolicy,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 4004,
            shutdown_timeout: 30,
            startup_policy: StartupPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Validates configuration values.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.shutdown_timeout == 0 || self.shutdown_timeout > 300 {
            return Err(anyhow!(
                "Shutdown timeout {} seconds is invalid. Must be between 1 and 300 seconds.",
                self.shutdown_timeout
            ));
        }

        Ok(())
    }

    /// Returns the socket address to bind.
    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the graceful shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Returns whether the server binds to all interfaces.
    #[must_use]
    pub const fn binds_to_all_interfaces(&self) -> bool {
        match self.host {
            IpAddr::V4(addr) => addr.is_unspecified(),
            IpAddr::V6(addr) => addr.is_unspecified(),
        }
    }

    /// Logs the configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            host = %self.host,
            port = self.port,
            shutdown_timeout_secs = self.shutdown_timeout,
            startup_policy = ?self.startup_policy,
            "Server configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_contract() {
        let config = ServerConfig::default();
        assert_eq!(config.server_addr().port(), 4004);
        assert!(config.binds_to_all_interfaces());
        assert_eq!(config.startup_policy, StartupPolicy::Continue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_shutdown_timeout() {
        let config = ServerConfig {
            shutdown_timeout: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
