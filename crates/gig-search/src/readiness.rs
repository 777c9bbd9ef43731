//! Search readiness sequencing.
//!
//! Readiness is a connectivity check followed by an existence check, and
//! index creation only when the index is missing. Every step is awaited in
//! order and failures are returned unchanged; the sequencer never retries.

use async_trait::async_trait;

use crate::{ClusterHealth, IndexCreation, Result, TRACING_TARGET_READINESS};

/// The search engine operations readiness depends on.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Verifies the engine is reachable. Any retry policy lives here.
    async fn check_connection(&self) -> Result<ClusterHealth>;

    /// Returns whether `index` exists.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Creates `index`.
    async fn create_index(&self, index: &str) -> Result<IndexCreation>;
}

/// Result of a successful readiness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessReport {
    /// Index that is now known to exist.
    pub index: String,
    /// Cluster status reported by the connectivity check.
    pub cluster_status: String,
    /// Whether this run created the index.
    pub created: bool,
}

/// Ensures the search engine is reachable and the index exists.
#[derive(Debug, Clone)]
pub struct SearchReadiness<E> {
    engine: E,
    index: String,
}

impl<E: SearchEngine> SearchReadiness<E> {
    /// Creates a sequencer for `index`.
    pub fn new(engine: E, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
        }
    }

    /// Returns the engine, for handing to request handlers once ready.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs the readiness sequence.
    pub async fn ensure(&self) -> Result<ReadinessReport> {
        let index = self.index.as_str();

        let health = self.engine.check_connection().await.inspect_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_READINESS,
                error = %err,
                "Connection to search engine failed"
            );
        })?;

        let exists = self.engine.index_exists(index).await.inspect_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_READINESS,
                index,
                error = %err,
                "Could not check for search index"
            );
        })?;

        let created = if exists {
            tracing::info!(target: TRACING_TARGET_READINESS, index, "Index already exists");
            false
        } else {
            let outcome = self.engine.create_index(index).await.inspect_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET_READINESS,
                    index,
                    error = %err,
                    "Could not create search index"
                );
            })?;
            tracing::info!(target: TRACING_TARGET_READINESS, index, ?outcome, "Index ensured");
            outcome == IndexCreation::Created
        };

        Ok(ReadinessReport {
            index: index.to_owned(),
            cluster_status: health.status,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct MockEngine {
        calls: Mutex<Vec<&'static str>>,
        exists: AtomicBool,
        unreachable: bool,
        hang_on_check: bool,
    }

    impl MockEngine {
        fn record(&self, call: &'static str) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl SearchEngine for MockEngine {
        async fn check_connection(&self) -> Result<ClusterHealth> {
            self.record("check");
            if self.hang_on_check {
                std::future::pending::<()>().await;
            }
            if self.unreachable {
                return Err(Error::Unreachable {
                    attempts: 1,
                    reason: "connection refused".into(),
                });
            }
            Ok(ClusterHealth {
                cluster_name: "test".into(),
                status: "yellow".into(),
            })
        }

        async fn index_exists(&self, _index: &str) -> Result<bool> {
            self.record("exists");
            Ok(self.exists.load(Ordering::SeqCst))
        }

        async fn create_index(&self, _index: &str) -> Result<IndexCreation> {
            self.record("create");
            self.exists.store(true, Ordering::SeqCst);
            Ok(IndexCreation::Created)
        }
    }

    #[tokio::test]
    async fn creates_missing_index() -> anyhow::Result<()> {
        let readiness = SearchReadiness::new(MockEngine::default(), "gigs");

        let report = readiness.ensure().await?;

        assert!(report.created);
        assert_eq!(report.index, "gigs");
        assert_eq!(report.cluster_status, "yellow");
        assert_eq!(readiness.engine().calls(), ["check", "exists", "create"]);
        Ok(())
    }

    #[tokio::test]
    async fn existing_index_is_left_alone() -> anyhow::Result<()> {
        let engine = MockEngine::default();
        engine.exists.store(true, Ordering::SeqCst);
        let readiness = SearchReadiness::new(engine, "gigs");

        let report = readiness.ensure().await?;

        assert!(!report.created);
        assert_eq!(readiness.engine().calls(), ["check", "exists"]);
        Ok(())
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() -> anyhow::Result<()> {
        let readiness = SearchReadiness::new(MockEngine::default(), "gigs");

        assert!(readiness.ensure().await?.created);
        assert!(!readiness.ensure().await?.created);

        let creates = readiness
            .engine()
            .calls()
            .into_iter()
            .filter(|call| *call == "create")
            .count();
        assert_eq!(creates, 1);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_engine_stops_before_index_checks() {
        let engine = MockEngine {
            unreachable: true,
            ..MockEngine::default()
        };
        let readiness = SearchReadiness::new(engine, "gigs");

        assert!(readiness.ensure().await.is_err());
        assert_eq!(readiness.engine().calls(), ["check"]);
    }

    #[tokio::test]
    async fn pending_check_never_completes() {
        let engine = MockEngine {
            hang_on_check: true,
            ..MockEngine::default()
        };
        let readiness = SearchReadiness::new(engine, "gigs");

        let outcome = tokio::time::timeout(Duration::from_millis(50), readiness.ensure()).await;

        assert!(outcome.is_err());
        assert_eq!(readiness.engine().calls(), ["check"]);
    }
}
