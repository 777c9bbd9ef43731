//! Startup sequencing and HTTP serving.

mod error;
mod gates;
mod http_server;
mod lifecycle;
mod shutdown;

pub use error::{ServerError, ServerResult};
pub use gates::{QueueGate, SearchGate};
pub use http_server::serve;
pub use lifecycle::{LifecycleController, ReadinessGate, Startup};
pub use shutdown::shutdown_signal;
