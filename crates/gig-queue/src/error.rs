//! Error types and utilities for broker operations.

use std::time::Duration;

/// Result type for all broker operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for broker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// Serialization errors when decoding message payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Stream lookup or creation failed
    #[error("Stream operation failed on '{stream}': {reason}")]
    Stream { stream: String, reason: String },

    /// Consumer creation or subscription failed
    #[error("Consumer '{consumer}' error: {reason}")]
    Consumer { consumer: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("Broker operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create a stream error
    pub fn stream(stream: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stream {
            stream: stream.into(),
            reason: reason.into(),
        }
    }

    /// Create a consumer error
    pub fn consumer(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Consumer {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Returns whether retrying the failed operation may succeed.
    ///
    /// Only transport-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        let timeout = Error::Timeout {
            timeout: Duration::from_secs(1),
        };
        let connection = Error::Connection(Box::new(std::io::Error::other("refused")));

        assert!(timeout.is_retryable());
        assert!(connection.is_retryable());
    }

    #[test]
    fn logical_errors_are_not_retryable() {
        assert!(!Error::invalid_config("empty url").is_retryable());
        assert!(!Error::consumer("gig-queue", "exists").is_retryable());
    }

    #[test]
    fn display_names_the_resource() {
        let error = Error::stream("JOBBER_GIG", "not found");
        assert_eq!(
            error.to_string(),
            "Stream operation failed on 'JOBBER_GIG': not found"
        );
    }
}
