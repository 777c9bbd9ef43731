//! Message handler seam between the broker and the gig domain.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::{Result, TRACING_TARGET_CONSUMER};

/// A delivered message, detached from the broker acknowledgement handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Subject the message was published on.
    pub subject: String,
    /// Raw payload bytes.
    pub payload: Bytes,
}

impl QueueMessage {
    /// Creates a new message.
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }

    /// Decodes the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Processes messages delivered to a consumer.
///
/// Returning `Ok` acknowledges the message; returning an error negatively
/// acknowledges it so the broker redelivers.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles one delivery.
    async fn handle(&self, message: QueueMessage) -> Result<()>;
}

/// Handler that records each delivery in the log and acknowledges it.
///
/// Used when no domain handler is wired in.
#[derive(Debug, Clone)]
pub struct TracingHandler {
    name: &'static str,
}

impl TracingHandler {
    /// Creates a handler labelled with `name` in log records.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl MessageHandler for TracingHandler {
    async fn handle(&self, message: QueueMessage) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_CONSUMER,
            handler = self.name,
            subject = %message.subject,
            payload_bytes = message.payload.len(),
            "Received message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rating {
        #[serde(rename = "gigId")]
        gig_id: String,
        rating: u8,
    }

    #[test]
    fn decodes_json_payload() {
        let message = QueueMessage::new(
            "jobber-update-gig.update-gig",
            r#"{"gigId":"g1","rating":5}"#.as_bytes().to_vec(),
        );

        let rating: Rating = message.json().expect("payload should decode");
        assert_eq!(
            rating,
            Rating {
                gig_id: "g1".to_owned(),
                rating: 5
            }
        );
    }

    #[test]
    fn malformed_payload_is_a_serialization_error() {
        let message = QueueMessage::new("jobber-gig.get-sellers", b"not json".to_vec());
        let result = message.json::<Rating>();
        assert!(matches!(result, Err(crate::Error::Serialization(_))));
    }

    #[tokio::test]
    async fn tracing_handler_acknowledges() {
        let handler = TracingHandler::new("seed");
        let message = QueueMessage::new("jobber-gig.get-sellers", Bytes::new());
        assert!(handler.handle(message).await.is_ok());
    }
}
