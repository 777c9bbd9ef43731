//! Startup consumers and the handler seam they deliver to.

mod binding;
mod direct;
mod handler;

pub use binding::{ConsumerBinding, GigUpdateBinding, SeedBinding};
pub use direct::register_direct_consumer;
pub use handler::{MessageHandler, QueueMessage, TracingHandler};
