#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for search client operations.
pub const TRACING_TARGET_CLIENT: &str = "gig_search::client";

/// Tracing target for connectivity checks and their retries.
pub const TRACING_TARGET_CONNECTION: &str = "gig_search::connection";

/// Tracing target for the search readiness sequence.
pub const TRACING_TARGET_READINESS: &str = "gig_search::readiness";

mod client;
mod config;
mod error;
mod readiness;
mod retry;

pub use client::{ClusterHealth, IndexCreation, SearchClient};
pub use config::SearchConfig;
pub use error::{Error, Result};
pub use readiness::{ReadinessReport, SearchEngine, SearchReadiness};
pub use retry::RetryConfig;
