#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for principal extraction.
pub const TRACING_TARGET_AUTHENTICATION: &str = "gig_server::authentication";

/// Tracing target for the trust-boundary gate.
pub const TRACING_TARGET_GATEWAY: &str = "gig_server::gateway";

/// Tracing target for the error responder.
pub const TRACING_TARGET_ERROR: &str = "gig_server::error";

/// Tracing target for security middleware other than authentication.
pub const TRACING_TARGET_SECURITY: &str = "gig_server::security";

/// Tracing target for pipeline assembly.
pub const TRACING_TARGET_PIPELINE: &str = "gig_server::pipeline";

mod error;
mod pipeline;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;

pub use crate::error::{Error, Result};
pub use crate::pipeline::RequestPipeline;
