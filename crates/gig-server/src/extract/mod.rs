//! Request extractors.
//!
//! [`Json`] and [`Form`] replace the axum extractors of the same name so
//! body failures become classified errors.

mod forwarded;
mod principal;
mod reject;

pub use crate::extract::forwarded::ForwardedInfo;
pub use crate::extract::principal::AuthPrincipal;
pub use crate::extract::reject::{Form, Json};
