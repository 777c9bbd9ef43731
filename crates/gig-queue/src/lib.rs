#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for broker connection operations.
///
/// Use this target for logging connection establishment, retries, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "gig_queue::connection";

/// Tracing target for consumer registration and message delivery.
pub const TRACING_TARGET_CONSUMER: &str = "gig_queue::consumer";

/// Tracing target for the queue startup sequence.
pub const TRACING_TARGET_STARTUP: &str = "gig_queue::startup";

mod client;
pub mod consumer;
mod error;
mod retry;
mod startup;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use client::{QueueClient, QueueConfig};
pub use error::{Error, Result};
pub use retry::RetryConfig;
pub use startup::{BrokerConnector, JetStreamConnector, QueueStartup, QueueState};
