//! Broker client wrapper and connection management.
//!
//! The `QueueClient` is the single broker handle of the service. It wraps the
//! `async-nats` client, which multiplexes every subscription over one TCP
//! connection, so clones share that connection.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, jetstream};
use tokio::time::timeout;

use super::queue_config::QueueConfig;
use crate::{Error, Result, TRACING_TARGET_CONNECTION};

/// Broker client wrapper with connection management.
///
/// This wrapper is cheaply cloneable and thread-safe.
#[derive(Debug, Clone)]
pub struct QueueClient {
    inner: Arc<QueueClientInner>,
}

#[derive(Debug)]
struct QueueClientInner {
    jetstream: jetstream::Context,
}

impl QueueClient {
    /// Connects to the broker, retrying transport failures with backoff.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: QueueConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = ?config.servers(),
            client_name = config.name(),
            "Connecting to NATS"
        );

        let retry = config.connect_retry();
        let client = retry.retry(|| Self::connect_once(&config)).await?;

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            "Successfully connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(QueueClientInner {
                jetstream: jetstream::new(client),
            }),
        })
    }

    async fn connect_once(config: &QueueConfig) -> Result<Client> {
        let mut options = ConnectOptions::new()
            .name(config.name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout());

        if let Some(token) = config.token() {
            options = options.token(token.to_owned());
        }

        if let Some(max_reconnects) = config.max_reconnects_option() {
            options = options.max_reconnects(max_reconnects);
        }

        let reconnect_delay_ms = config.reconnect_delay().as_millis() as u64;
        options = options.reconnect_delay_callback(move |attempts| {
            Duration::from_millis(std::cmp::min(
                reconnect_delay_ms * 2_u64.pow(attempts.min(16) as u32),
                30_000,
            ))
        });

        let connect_timeout = config.connect_timeout();
        timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), options),
        )
        .await
        .map_err(|_| Error::Timeout {
            timeout: connect_timeout,
        })?
        .map_err(|e| Error::Connection(Box::new(e)))
    }

    /// Returns the JetStream context bound to this connection.
    #[must_use]
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.inner.jetstream
    }
}
