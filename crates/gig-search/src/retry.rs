//! Retry logic for the connectivity check.

use std::future::Future;
use std::time::Duration;

use crate::{Result, TRACING_TARGET_CONNECTION};

/// Exponential backoff for operations whose errors may be transient.
///
/// The readiness sequencer never retries; only the client's connectivity
/// check goes through this policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a policy with `max_attempts` retries starting at `initial_backoff`.
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

    /// Total number of attempts, the first one included.
    #[inline]
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let millis = (self.initial_backoff.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries run out. The last error is returned unchanged.
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
                        max_attempts = self.total_attempts(),
                        backoff_ms = backoff.as_millis() as u64,
                        "Connection to search engine failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
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
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::new(4, Duration::from_millis(500))
            .with_max_backoff(Duration::from_secs(2));

        assert_eq!(config.backoff_for(0), Duration::from_millis(500));
        assert_eq!(config.backoff_for(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for(2), Duration::from_secs(2));
        assert_eq!(config.backoff_for(5), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn stops_after_the_last_attempt() {
        let config = RetryConfig::new(2, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = config
            .retry(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::status("cluster_health", 503, ""))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Status { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), config.total_attempts());
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let config = RetryConfig::new(3, Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));

        let result = config
            .retry(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::status("cluster_health", 401, "unauthorized"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
