//! Errors raised while assembling the request pipeline.

/// Result type for pipeline assembly.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to build the request pipeline from configuration.
///
/// These errors happen before any request is served. Request-time failures
/// use [`handler::Error`](crate::handler::Error) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is unusable.
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A required pipeline stage was never configured.
    #[error("Pipeline stage '{stage}' was not configured")]
    MissingStage { stage: &'static str },
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
