//! Assembly of the request pipeline.

use axum::Router;

use crate::handler::{DomainRoutes, routes};
use crate::middleware::{
    FallbackHandler, RecoveryConfig, RouterErrorResponderExt, RouterRecoveryExt,
    RouterSecurityExt, RouterStandardExt, SecurityConfig, SecurityStack, StandardConfig,
};
use crate::service::ServiceState;
use crate::{Error, Result, TRACING_TARGET_PIPELINE};

/// Builds the service [`Router`] from its stages.
///
/// Stages may be configured in any order; [`into_router`] always layers them
/// the same way, from the outside in:
///
/// 1. error responder
/// 2. security (trust proxy, parameter pollution, headers, CORS, principal)
/// 3. standard (compression, decompression, body limit)
/// 4. recovery (timeouts, panics)
/// 5. health probe and gated domain routes
///
/// [`into_router`]: RequestPipeline::into_router
#[derive(Debug)]
#[must_use = "pipelines do nothing unless turned into a router"]
pub struct RequestPipeline {
    state: ServiceState,
    security: Option<SecurityStack>,
    standard: Option<StandardConfig>,
    recovery: RecoveryConfig,
    routes: Option<DomainRoutes>,
    fallback: Option<FallbackHandler>,
}

impl RequestPipeline {
    /// Starts a pipeline around `state`.
    pub fn new(state: ServiceState) -> Self {
        Self {
            state,
            security: None,
            standard: None,
            recovery: RecoveryConfig::default(),
            routes: None,
            fallback: None,
        }
    }

    /// Returns the application state.
    #[inline]
    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    /// Configures the security stage.
    pub fn security(mut self, config: &SecurityConfig) -> Result<Self> {
        let stack = SecurityStack::new(config, self.state.principal_keys.clone())?;
        self.security = Some(stack);
        Ok(self)
    }

    /// Configures the standard stage.
    pub fn standard(mut self, config: &StandardConfig) -> Self {
        self.standard = Some(config.clone());
        self
    }

    /// Overrides the recovery stage, which otherwise uses its defaults.
    pub fn recovery(mut self, config: &RecoveryConfig) -> Self {
        self.recovery = config.clone();
        self
    }

    /// Mounts the domain routes behind the gateway gate.
    pub fn routes(mut self, domain: DomainRoutes) -> Self {
        self.routes = Some(domain);
        self
    }

    /// Installs the error responder with `fallback` for unclassified errors.
    pub fn error_responder(mut self, fallback: FallbackHandler) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Layers every stage and returns the finished router.
    pub fn into_router(self) -> Result<Router> {
        let security = self.security.ok_or(Error::MissingStage { stage: "security" })?;
        let standard = self.standard.ok_or(Error::MissingStage { stage: "standard" })?;
        let domain = self.routes.ok_or(Error::MissingStage { stage: "routes" })?;
        let fallback = self.fallback.ok_or(Error::MissingStage {
            stage: "error_responder",
        })?;

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            body_limit = standard.body_limit,
            request_timeout_secs = self.recovery.request_timeout,
            "Request pipeline assembled"
        );

        Ok(routes(domain, self.state)
            .with_recovery(&self.recovery)
            .with_standard(&standard)
            .with_security(&security)
            .with_error_responder(fallback))
    }
}
