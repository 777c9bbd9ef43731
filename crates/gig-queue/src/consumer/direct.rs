//! Durable pull consumers with a background delivery loop.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::consumer::pull::{self, Stream as MessageStream};
use async_nats::jetstream::consumer::{AckPolicy, PullConsumer};
use async_nats::jetstream::{self, AckKind, stream};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{ConsumerBinding, MessageHandler, QueueMessage};
use crate::{Error, Result, TRACING_TARGET_CONSUMER};

/// Time the broker waits for an acknowledgement before redelivering.
const ACK_WAIT: Duration = Duration::from_secs(60);

/// Ensures the stream of `B` exists, creates its durable consumer and spawns
/// the delivery loop on `tracker`.
///
/// Returns once the consumer is registered; deliveries are processed in the
/// background until `shutdown` is cancelled.
#[tracing::instrument(
    skip_all,
    target = TRACING_TARGET_CONSUMER,
    fields(stream = B::STREAM, consumer = B::DURABLE)
)]
pub async fn register_direct_consumer<B: ConsumerBinding>(
    jetstream: &jetstream::Context,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
    tracker: &TaskTracker,
) -> Result<()> {
    let stream_config = stream::Config {
        name: B::STREAM.to_owned(),
        description: Some(B::DESCRIPTION.to_owned()),
        subjects: vec![B::SUBJECT.to_owned()],
        ..Default::default()
    };

    let stream = jetstream
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| Error::stream(B::STREAM, e.to_string()))?;

    let consumer_config = pull::Config {
        durable_name: Some(B::DURABLE.to_owned()),
        description: Some(B::DESCRIPTION.to_owned()),
        filter_subject: B::SUBJECT.to_owned(),
        ack_policy: AckPolicy::Explicit,
        ack_wait: ACK_WAIT,
        ..Default::default()
    };

    let consumer: PullConsumer = stream
        .get_or_create_consumer(B::DURABLE, consumer_config)
        .await
        .map_err(|e| Error::consumer(B::DURABLE, e.to_string()))?;

    let messages = consumer
        .messages()
        .await
        .map_err(|e| Error::consumer(B::DURABLE, e.to_string()))?;

    tracing::info!(
        target: TRACING_TARGET_CONSUMER,
        stream = B::STREAM,
        subject = B::SUBJECT,
        consumer = B::DURABLE,
        "Consumer registered"
    );

    tracker.spawn(deliver(B::DURABLE, messages, handler, shutdown));
    Ok(())
}

async fn deliver(
    consumer: &'static str,
    mut messages: MessageStream,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => break,
            next = messages.next() => next,
        };

        match next {
            Some(Ok(message)) => acknowledge(consumer, handler.as_ref(), message).await,
            Some(Err(err)) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONSUMER,
                    consumer,
                    error = %err,
                    "Failed to receive message"
                );
            }
            None => {
                tracing::warn!(
                    target: TRACING_TARGET_CONSUMER,
                    consumer,
                    "Message stream closed"
                );
                break;
            }
        }
    }

    tracing::info!(target: TRACING_TARGET_CONSUMER, consumer, "Consumer stopped");
}

async fn acknowledge(consumer: &str, handler: &dyn MessageHandler, message: jetstream::Message) {
    let delivery = QueueMessage::new(message.subject.to_string(), message.payload.clone());
    let subject = delivery.subject.clone();

    let ack = match handler.handle(delivery).await {
        Ok(()) => message.ack().await,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_CONSUMER,
                consumer,
                subject = %subject,
                error = %err,
                "Message handler failed, requesting redelivery"
            );
            message.ack_with(AckKind::Nak(None)).await
        }
    };

    if let Err(err) = ack {
        tracing::warn!(
            target: TRACING_TARGET_CONSUMER,
            consumer,
            subject = %subject,
            error = %err,
            "Failed to acknowledge message"
        );
    }
}
