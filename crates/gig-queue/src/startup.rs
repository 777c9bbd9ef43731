//! Queue startup sequencing.
//!
//! Startup walks a fixed state machine:
//!
//! ```text
//! Disconnected -> Connecting -> PrimaryRegistered -> SeedRegistered -> Ready
//! ```
//!
//! Each step is awaited before the next begins, so the seed consumer is never
//! registered unless the primary consumer is. A failure stops the walk and is
//! returned to the caller unchanged; the sequencer itself never retries.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::consumer::{GigUpdateBinding, MessageHandler, SeedBinding, register_direct_consumer};
use crate::{Error, QueueClient, QueueConfig, Result, TRACING_TARGET_STARTUP};

/// Progress of the queue startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum QueueState {
    /// Nothing has been attempted yet.
    Disconnected,
    /// Waiting for the broker channel.
    Connecting,
    /// The gig update consumer is registered.
    PrimaryRegistered,
    /// The seed consumer is registered.
    SeedRegistered,
    /// Both consumers are registered and the channel is handed over.
    Ready,
}

/// The collaborators the startup sequence drives.
///
/// `connect` acquires the single broker channel; the two registration calls
/// receive that channel by reference and never create their own.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Channel handle returned by [`connect`](Self::connect).
    type Channel: Send + Sync;

    /// Acquires the broker channel. Any retry policy lives here.
    async fn connect(&self) -> Result<Self::Channel>;

    /// Registers the primary domain-event consumer.
    async fn register_primary(&self, channel: &Self::Channel) -> Result<()>;

    /// Registers the seed/bootstrap-data consumer.
    async fn register_seed(&self, channel: &Self::Channel) -> Result<()>;
}

/// Runs the queue startup state machine against a [`BrokerConnector`].
#[derive(Debug)]
pub struct QueueStartup<C> {
    connector: C,
    state: QueueState,
}

impl<C: BrokerConnector> QueueStartup<C> {
    /// Creates a sequencer in the [`QueueState::Disconnected`] state.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: QueueState::Disconnected,
        }
    }

    /// Returns the furthest state reached so far.
    #[inline]
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Connects, then registers the primary and seed consumers in order.
    ///
    /// On success the channel is returned to the caller, which owns it from
    /// then on. On failure the state stays at the last completed step.
    pub async fn start(&mut self) -> Result<C::Channel> {
        if self.state != QueueState::Disconnected {
            return Err(Error::operation(
                "queue_startup",
                format!("startup already ran (state: {})", self.state),
            ));
        }

        self.advance(QueueState::Connecting);
        let channel = self
            .connector
            .connect()
            .await
            .inspect_err(|err| self.report_failure(err))?;

        self.connector
            .register_primary(&channel)
            .await
            .inspect_err(|err| self.report_failure(err))?;
        self.advance(QueueState::PrimaryRegistered);

        self.connector
            .register_seed(&channel)
            .await
            .inspect_err(|err| self.report_failure(err))?;
        self.advance(QueueState::SeedRegistered);

        self.advance(QueueState::Ready);
        Ok(channel)
    }

    fn advance(&mut self, next: QueueState) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            from = %self.state,
            to = %next,
            "Queue startup transition"
        );
        self.state = next;
    }

    fn report_failure(&self, err: &Error) {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            state = %self.state,
            error = %err,
            "Queue startup failed"
        );
    }
}

/// [`BrokerConnector`] backed by NATS JetStream.
///
/// Consumer loops are spawned on `tracker` and stop when `shutdown` is
/// cancelled.
#[derive(Clone)]
pub struct JetStreamConnector {
    config: QueueConfig,
    primary: Arc<dyn MessageHandler>,
    seed: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl JetStreamConnector {
    /// Creates a connector with the handlers for the primary and seed consumers.
    pub fn new(
        config: QueueConfig,
        primary: Arc<dyn MessageHandler>,
        seed: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            config,
            primary,
            seed,
            shutdown,
            tracker,
        }
    }
}

impl std::fmt::Debug for JetStreamConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JetStreamConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrokerConnector for JetStreamConnector {
    type Channel = QueueClient;

    async fn connect(&self) -> Result<QueueClient> {
        QueueClient::connect(self.config.clone()).await
    }

    async fn register_primary(&self, channel: &QueueClient) -> Result<()> {
        register_direct_consumer::<GigUpdateBinding>(
            channel.jetstream(),
            self.primary.clone(),
            self.shutdown.clone(),
            &self.tracker,
        )
        .await
    }

    async fn register_seed(&self, channel: &QueueClient) -> Result<()> {
        register_direct_consumer::<SeedBinding>(
            channel.jetstream(),
            self.seed.clone(),
            self.shutdown.clone(),
            &self.tracker,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Connect,
        Primary,
        Seed,
    }

    #[derive(Default)]
    struct RecordingConnector {
        calls: Mutex<Vec<Step>>,
        fail_at: Option<Step>,
        hang_at: Option<Step>,
    }

    impl RecordingConnector {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Self::default()
            }
        }

        fn hanging_at(step: Step) -> Self {
            Self {
                hang_at: Some(step),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Step> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }

        async fn step(&self, step: Step) -> Result<()> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(step);
            }
            if self.hang_at == Some(step) {
                std::future::pending::<()>().await;
            }
            if self.fail_at == Some(step) {
                return Err(Error::operation("test", format!("{step:?} failed")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrokerConnector for RecordingConnector {
        type Channel = &'static str;

        async fn connect(&self) -> Result<&'static str> {
            self.step(Step::Connect).await.map(|()| "channel")
        }

        async fn register_primary(&self, channel: &&'static str) -> Result<()> {
            assert_eq!(*channel, "channel");
            self.step(Step::Primary).await
        }

        async fn register_seed(&self, channel: &&'static str) -> Result<()> {
            assert_eq!(*channel, "channel");
            self.step(Step::Seed).await
        }
    }

    #[tokio::test]
    async fn runs_steps_in_order() -> anyhow::Result<()> {
        let mut startup = QueueStartup::new(RecordingConnector::default());
        assert_eq!(startup.state(), QueueState::Disconnected);

        let channel = startup.start().await?;

        assert_eq!(channel, "channel");
        assert_eq!(startup.state(), QueueState::Ready);
        assert_eq!(
            startup.connector.calls(),
            vec![Step::Connect, Step::Primary, Step::Seed]
        );
        Ok(())
    }

    #[tokio::test]
    async fn primary_failure_skips_seed() {
        let mut startup = QueueStartup::new(RecordingConnector::failing_at(Step::Primary));

        assert!(startup.start().await.is_err());
        assert_eq!(startup.state(), QueueState::Connecting);
        assert_eq!(startup.connector.calls(), vec![Step::Connect, Step::Primary]);
    }

    #[tokio::test]
    async fn connect_failure_registers_nothing() {
        let mut startup = QueueStartup::new(RecordingConnector::failing_at(Step::Connect));

        assert!(startup.start().await.is_err());
        assert_eq!(startup.connector.calls(), vec![Step::Connect]);
    }

    #[tokio::test]
    async fn seed_failure_is_reported() {
        let mut startup = QueueStartup::new(RecordingConnector::failing_at(Step::Seed));

        assert!(startup.start().await.is_err());
        assert_eq!(startup.state(), QueueState::PrimaryRegistered);
    }

    #[tokio::test]
    async fn pending_connect_never_reaches_ready() {
        let mut startup = QueueStartup::new(RecordingConnector::hanging_at(Step::Connect));

        let outcome = tokio::time::timeout(Duration::from_millis(50), startup.start()).await;

        assert!(outcome.is_err());
        assert_eq!(startup.state(), QueueState::Connecting);
        assert_eq!(startup.connector.calls(), vec![Step::Connect]);
    }

    #[tokio::test]
    async fn pending_primary_never_attempts_seed() {
        let mut startup = QueueStartup::new(RecordingConnector::hanging_at(Step::Primary));

        let outcome = tokio::time::timeout(Duration::from_millis(50), startup.start()).await;

        assert!(outcome.is_err());
        assert_eq!(startup.connector.calls(), vec![Step::Connect, Step::Primary]);
    }

    #[tokio::test]
    async fn cannot_start_twice() -> anyhow::Result<()> {
        let mut startup = QueueStartup::new(RecordingConnector::default());
        startup.start().await?;

        assert!(startup.start().await.is_err());
        assert_eq!(startup.connector.calls().len(), 3);
        Ok(())
    }
}
