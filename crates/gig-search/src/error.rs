//! Error types for search engine operations.

/// Result type for all search operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for search engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with an unexpected status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Connectivity could not be established within the configured attempts.
    #[error("Search engine unreachable after {attempts} attempt(s): {reason}")]
    Unreachable { attempts: u32, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an unexpected status error
    pub fn status(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// Connection failures, timeouts and server-side statuses are retryable;
    /// client-side statuses and configuration errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::Unreachable { .. } | Self::InvalidConfig { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_statuses_are_retryable() {
        assert!(Error::status("cluster_health", 503, "").is_retryable());
        assert!(!Error::status("create_index", 400, "").is_retryable());
    }

    #[test]
    fn config_errors_are_final() {
        assert!(!Error::invalid_config("bad url").is_retryable());
        let unreachable = Error::Unreachable {
            attempts: 3,
            reason: "refused".into(),
        };
        assert!(!unreachable.is_retryable());
    }

    #[test]
    fn status_message_names_operation() {
        let err = Error::status("index_exists", 500, "boom");
        assert_eq!(err.to_string(), "index_exists returned HTTP 500: boom");
    }
}
