//! Server error types with recovery suggestions.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Errors raised while starting or running the service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request pipeline could not be assembled.
    #[error("Failed to assemble the request pipeline: {0}")]
    Pipeline(#[from] gig_server::Error),

    /// Queue startup failed.
    #[error("Queue startup failed: {0}")]
    Queue(#[from] gig_queue::Error),

    /// Search readiness failed.
    #[error("Search readiness failed: {0}")]
    Search(#[from] gig_search::Error),

    /// Failed to bind to the specified address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Runtime server error.
    #[error("Runtime error: {0}")]
    Runtime(#[source] io::Error),
}

impl ServerError {
    /// Creates a bind error with address context.
    pub fn bind_error(address: impl ToString, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_string(),
            source,
        }
    }

    /// Provides a human-readable suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Pipeline(_) => Some("Check the gateway URL and signing secrets"),
            Self::Queue(_) => Some("Check that the NATS server is running and NATS_URL is correct"),
            Self::Search(_) => {
                Some("Check that the search engine is running and ELASTIC_SEARCH_URL is correct")
            }
            Self::BindError { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => {
                    Some("Try using a port above 1024 or run with appropriate privileges")
                }
                io::ErrorKind::AddrInUse => Some(
                    "The port is already in use. Try a different port or stop the conflicting service",
                ),
                io::ErrorKind::AddrNotAvailable => {
                    Some("The address is not available. Check network interface configuration")
                }
                _ => Some("Check network configuration and firewall settings"),
            },
            Self::Runtime(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_mentions_address() {
        let error = ServerError::bind_error(
            "0.0.0.0:4004",
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );

        assert!(error.to_string().contains("0.0.0.0:4004"));
        assert!(error.suggestion().is_some_and(|s| s.contains("already in use")));
    }
}
