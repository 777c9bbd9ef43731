//! Broker connection management and configuration.

mod queue_client;
mod queue_config;

pub use queue_client::QueueClient;
pub use queue_config::QueueConfig;
