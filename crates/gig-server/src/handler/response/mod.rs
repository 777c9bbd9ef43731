//! Response bodies written by the server itself.

mod error_response;

pub use error_response::{ERROR_STATUS, ErrorResponse};
