//! Readiness gates for the broker and the search engine.

use async_trait::async_trait;
use gig_queue::{BrokerConnector, JetStreamConnector, QueueStartup, QueueState};
use gig_search::{ReadinessReport, SearchClient, SearchConfig, SearchEngine, SearchReadiness};

use super::{ReadinessGate, ServerResult};
use crate::TRACING_TARGET_STARTUP;

/// Runs queue startup and keeps the broker channel it produces.
pub struct QueueGate<C: BrokerConnector = JetStreamConnector> {
    startup: QueueStartup<C>,
    channel: Option<C::Channel>,
}

impl<C: BrokerConnector> QueueGate<C> {
    /// Creates a gate around `connector`.
    pub fn new(connector: C) -> Self {
        Self {
            startup: QueueStartup::new(connector),
            channel: None,
        }
    }

    /// Returns the broker channel once startup completed.
    pub fn channel(&self) -> Option<&C::Channel> {
        self.channel.as_ref()
    }

    /// Returns the queue startup state.
    pub fn state(&self) -> QueueState {
        self.startup.state()
    }
}

#[async_trait]
impl<C> ReadinessGate for QueueGate<C>
where
    C: BrokerConnector,
    C::Channel: Send,
{
    async fn open(&mut self) -> ServerResult<()> {
        let channel = self.startup.start().await?;
        self.channel = Some(channel);

        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            state = %self.state(),
            "Queue consumers registered"
        );
        Ok(())
    }
}

/// Runs search readiness for the configured index.
pub struct SearchGate<E = SearchClient> {
    readiness: SearchReadiness<E>,
    report: Option<ReadinessReport>,
}

impl SearchGate<SearchClient> {
    /// Builds the search client from configuration.
    pub fn from_config(config: &SearchConfig) -> ServerResult<Self> {
        let client = SearchClient::new(config.clone())?;
        Ok(Self::new(SearchReadiness::new(
            client,
            config.search_index.clone(),
        )))
    }
}

impl<E: SearchEngine> SearchGate<E> {
    /// Creates a gate around `readiness`.
    pub fn new(readiness: SearchReadiness<E>) -> Self {
        Self {
            readiness,
            report: None,
        }
    }

    /// Returns the search engine.
    pub fn engine(&self) -> &E {
        self.readiness.engine()
    }

    /// Returns the readiness report once the gate opened.
    pub fn report(&self) -> Option<&ReadinessReport> {
        self.report.as_ref()
    }
}

#[async_trait]
impl<E: SearchEngine> ReadinessGate for SearchGate<E> {
    async fn open(&mut self) -> ServerResult<()> {
        let report = self.readiness.ensure().await?;

        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            index = %report.index,
            cluster_status = %report.cluster_status,
            created = report.created,
            "Search index ready"
        );

        self.report = Some(report);
        Ok(())
    }
}
