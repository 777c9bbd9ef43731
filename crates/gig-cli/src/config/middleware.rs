//! Middleware configuration for the request pipeline.

use clap::Args;
use gig_server::middleware::{RecoveryConfig, SecurityConfig, StandardConfig};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Security, body handling and recovery settings.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// CORS origin and trusted proxy hops.
    #[clap(flatten)]
    pub security: SecurityConfig,

    /// Request body limit.
    #[clap(flatten)]
    pub standard: StandardConfig,

    /// Request timeout.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            api_gateway_url = %self.security.api_gateway_url,
            trust_proxy_hops = self.security.trust_proxy_hops,
            body_limit = self.standard.body_limit,
            request_timeout_secs = self.recovery.request_timeout,
            "Middleware configuration"
        );
    }
}
