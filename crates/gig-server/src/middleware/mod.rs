//! Middleware for `axum::Router` and HTTP request processing.
//!
//! Each concern is exposed as a router extension trait so the pipeline can
//! apply the stages in a fixed order:
//!
//! - [`RouterSecurityExt`]: trust proxy, parameter pollution, hardening
//!   headers, CORS and principal extraction
//! - [`RouterStandardExt`]: compression, decompression and the body limit
//! - [`RouterRecoveryExt`]: timeouts and panics
//! - [`RouterErrorResponderExt`]: the terminal error responder

mod authentication;
mod error_responder;
mod gateway;
mod recovery;
mod security;
mod standard;

pub use authentication::extract_principal;
pub use error_responder::{FallbackHandler, RouterErrorResponderExt, default_fallback};
pub use gateway::verify_gateway;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub(crate) use security::dedupe_params;
pub use security::{PollutedParams, RouterSecurityExt, SecurityConfig, SecurityStack};
pub use standard::{DEFAULT_BODY_LIMIT, RouterStandardExt, StandardConfig};
