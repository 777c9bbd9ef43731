//! Security middleware for HTTP request protection.
//!
//! Applied outermost first: trust proxy, parameter pollution, hardening
//! headers, CORS, then principal extraction. None of these stages blocks a
//! request except principal extraction on an invalid credential.

mod cors;
mod headers;
mod hpp;
mod trust_proxy;

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state, map_response};
#[cfg(feature = "config")]
use clap::Args;
pub(crate) use hpp::dedupe_params;
pub use hpp::PollutedParams;
use serde::{Deserialize, Serialize};

use super::extract_principal;
use crate::service::PrincipalKeys;
use crate::{Error, Result, TRACING_TARGET_PIPELINE};

/// Configuration for the security middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SecurityConfig {
    /// The single origin allowed by CORS: the API gateway.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "API_GATEWAY_URL", default_value = "http://localhost:4000")
    )]
    pub api_gateway_url: String,

    /// Number of reverse proxies whose forwarding headers are trusted.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "TRUST_PROXY_HOPS", default_value = "1")
    )]
    pub trust_proxy_hops: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_gateway_url: "http://localhost:4000".to_owned(),
            trust_proxy_hops: 1,
        }
    }
}

impl SecurityConfig {
    /// Creates a configuration allowing `api_gateway_url`.
    pub fn new(api_gateway_url: impl Into<String>) -> Self {
        Self {
            api_gateway_url: api_gateway_url.into(),
            ..Self::default()
        }
    }

    /// Returns the CORS origin derived from the gateway URL.
    pub fn allowed_origin(&self) -> Result<HeaderValue> {
        let url = url::Url::parse(self.api_gateway_url.trim())
            .map_err(|e| Error::invalid_config("api_gateway_url", e.to_string()))?;

        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(Error::invalid_config(
                "api_gateway_url",
                "URL has no scheme, host and port",
            ));
        }

        HeaderValue::from_str(&origin.ascii_serialization())
            .map_err(|e| Error::invalid_config("api_gateway_url", e.to_string()))
    }
}

/// Validated security middleware settings.
#[derive(Debug, Clone)]
pub struct SecurityStack {
    allowed_origin: HeaderValue,
    trust_proxy_hops: usize,
    principal_keys: PrincipalKeys,
}

impl SecurityStack {
    /// Validates `config` and pairs it with the bearer token keys.
    pub fn new(config: &SecurityConfig, principal_keys: PrincipalKeys) -> Result<Self> {
        let allowed_origin = config.allowed_origin()?;

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            origin = ?allowed_origin,
            trust_proxy_hops = config.trust_proxy_hops,
            "Security stack configured"
        );

        Ok(Self {
            allowed_origin,
            trust_proxy_hops: config.trust_proxy_hops,
            principal_keys,
        })
    }
}

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Layers the security middleware in its fixed order.
    fn with_security(self, stack: &SecurityStack) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, stack: &SecurityStack) -> Self {
        // Layers wrap outward: the last one added sees the request first.
        self.layer(from_fn_with_state(
            stack.principal_keys.clone(),
            extract_principal,
        ))
        .layer(cors::cors_layer(stack.allowed_origin.clone()))
        .layer(map_response(headers::harden))
        .layer(from_fn(hpp::parameter_pollution))
        .layer(from_fn_with_state(
            stack.trust_proxy_hops,
            trust_proxy::trust_proxy,
        ))
    }
}
