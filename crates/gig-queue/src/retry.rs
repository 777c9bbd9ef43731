//! Retry logic for broker connection acquisition.

use std::future::Future;
use std::time::Duration;

use crate::{Result, TRACING_TARGET_CONNECTION};

/// Configuration for retry behavior on failed operations.
///
/// Used by the connection factory only; the startup sequencer never retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            ..Self::default()
        }
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Calculate the backoff duration for a given attempt number.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let millis = (self.initial_backoff.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Retry an async operation according to this configuration.
    ///
    /// Non-retryable errors (see [`Error::is_retryable`](crate::Error::is_retryable)) are returned
    /// immediately; otherwise the last error is returned once the retries
    /// run out.
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let backoff = self.backoff_for(attempt);
                    attempt += 1;

                    tracing::warn!(
                        target: TRACING_TARGET_CONNECTION,
                        error = %err,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying operation after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    tracing::debug!(
                        target: TRACING_TARGET_CONNECTION,
                        error = %err,
                        retryable = err.is_retryable(),
                        "Giving up on operation"
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::Error;

    #[test]
    fn backoff_grows_exponentially() {
        let config = RetryConfig::new(3, Duration::from_millis(100));

        assert_eq!(config.backoff_for(0), Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(200));
        assert_eq!(config.backoff_for(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig::new(3, Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(300));

        assert_eq!(config.backoff_for(2), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn retries_transport_errors_until_success() {
        let config = RetryConfig::new(3, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = config
            .retry(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::Timeout {
                            timeout: Duration::from_secs(1),
                        })
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let config = RetryConfig::new(2, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = config
            .retry(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::Timeout {
                        timeout: Duration::from_secs(1),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_configuration_errors() {
        let config = RetryConfig::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result = config
            .retry(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::invalid_config("bad url"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
