//! Request-time error types.

mod http_error;

pub use http_error::{Error, ErrorKind, PendingError, Result};
