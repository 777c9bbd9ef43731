//! The server lifecycle controller.
//!
//! Startup runs in a fixed order and never binds the listener before queue
//! startup and search readiness have resolved:
//!
//! ```text
//! security → standard → routes → queue → search → error responder → bind
//! ```
//!
//! Failures while assembling the router are always fatal. Failures of the
//! queue, search and bind stages follow the [`StartupPolicy`].

use std::fmt;
use std::net::SocketAddr;
use std::process;

use async_trait::async_trait;
use axum::Router;
use gig_server::RequestPipeline;
use gig_server::handler::DomainRoutes;
use gig_server::middleware::{FallbackHandler, default_fallback};
use gig_server::service::ServiceState;
use tokio::net::TcpListener;

use crate::TRACING_TARGET_STARTUP;
use crate::config::{MiddlewareConfig, ServerConfig, StartupPolicy};
use crate::server::{ServerError, ServerResult};

/// A step of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StartupStage {
    Security,
    Standard,
    Routes,
    Queue,
    Search,
    ErrorResponder,
    Bind,
}

/// How a startup stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The stage failed; holds the error message.
    Failed(String),
}

/// Outcome of every stage that ran, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    stages: Vec<(StartupStage, StageOutcome)>,
}

impl StartupReport {
    fn completed(&mut self, stage: StartupStage) {
        tracing::debug!(target: TRACING_TARGET_STARTUP, %stage, "Startup stage completed");
        self.stages.push((stage, StageOutcome::Completed));
    }

    fn failed(&mut self, stage: StartupStage, error: &impl fmt::Display) {
        self.stages.push((stage, StageOutcome::Failed(error.to_string())));
    }

    /// Returns the stages that ran, in order.
    pub fn stages(&self) -> Vec<StartupStage> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }

    /// Returns the outcome of `stage`, if it ran.
    pub fn outcome(&self, stage: StartupStage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|(ran, _)| *ran == stage)
            .map(|(_, outcome)| outcome)
    }

    /// Returns the stages that failed.
    pub fn failures(&self) -> impl Iterator<Item = (StartupStage, &str)> {
        self.stages.iter().filter_map(|(stage, outcome)| match outcome {
            StageOutcome::Failed(reason) => Some((*stage, reason.as_str())),
            StageOutcome::Completed => None,
        })
    }

    /// Whether every stage, including the bind, completed.
    pub fn is_ready(&self) -> bool {
        self.outcome(StartupStage::Bind) == Some(&StageOutcome::Completed)
            && self.failures().next().is_none()
    }
}

/// A dependency that must be ready before the listener is bound.
#[async_trait]
pub trait ReadinessGate: Send {
    /// Brings the dependency up. Awaited to completion before the next stage.
    async fn open(&mut self) -> ServerResult<()>;
}

/// Everything startup produced.
///
/// The gates are kept so that the resources they own (the broker channel,
/// the search client) live as long as the server.
pub struct Startup<Q, S> {
    pub report: StartupReport,
    pub router: Router,
    /// `None` when the bind failed under [`StartupPolicy::Continue`].
    pub listener: Option<TcpListener>,
    pub queue: Q,
    pub search: S,
}

impl<Q, S> Startup<Q, S> {
    /// Returns the bound address, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }
}

/// Composes the request pipeline and the startup gates in a fixed order.
#[derive(Debug)]
#[must_use = "the controller does nothing until started"]
pub struct LifecycleController {
    server: ServerConfig,
    middleware: MiddlewareConfig,
    state: ServiceState,
    routes: DomainRoutes,
    fallback: FallbackHandler,
}

impl LifecycleController {
    /// Creates a controller with no domain routes and the default fallback.
    pub fn new(server: ServerConfig, middleware: MiddlewareConfig, state: ServiceState) -> Self {
        Self {
            server,
            middleware,
            state,
            routes: DomainRoutes::new(),
            fallback: default_fallback,
        }
    }

    /// Sets the domain routes mounted behind the gateway gate.
    pub fn with_routes(mut self, routes: DomainRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the handler for errors the responder does not render.
    pub fn with_fallback(mut self, fallback: FallbackHandler) -> Self {
        self.fallback = fallback;
        self
    }

    /// Runs the startup sequence.
    ///
    /// Returns an error for router assembly failures, and for queue, search
    /// or bind failures under [`StartupPolicy::Terminate`].
    pub async fn start<Q, S>(self, mut queue: Q, mut search: S) -> ServerResult<Startup<Q, S>>
    where
        Q: ReadinessGate,
        S: ReadinessGate,
    {
        let Self {
            server,
            middleware,
            state,
            routes,
            fallback,
        } = self;

        let policy = server.startup_policy;
        let mut report = StartupReport::default();

        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            ?policy,
            "Starting gig service"
        );

        let pipeline = RequestPipeline::new(state)
            .recovery(&middleware.recovery)
            .security(&middleware.security)
            .inspect_err(|err| fatal(StartupStage::Security, err))?;
        report.completed(StartupStage::Security);

        let pipeline = pipeline.standard(&middleware.standard);
        report.completed(StartupStage::Standard);

        let pipeline = pipeline.routes(routes);
        report.completed(StartupStage::Routes);

        open_gate(StartupStage::Queue, &mut queue, policy, &mut report).await?;
        open_gate(StartupStage::Search, &mut search, policy, &mut report).await?;

        let router = pipeline
            .error_responder(fallback)
            .into_router()
            .inspect_err(|err| fatal(StartupStage::ErrorResponder, err))?;
        report.completed(StartupStage::ErrorResponder);

        let listener = bind(&server, policy, &mut report).await?;

        Ok(Startup {
            report,
            router,
            listener,
            queue,
            search,
        })
    }
}

fn fatal(stage: StartupStage, error: &impl fmt::Display) {
    tracing::error!(
        target: TRACING_TARGET_STARTUP,
        %stage,
        error = %error,
        "Request pipeline could not be assembled"
    );
}

async fn open_gate<G: ReadinessGate>(
    stage: StartupStage,
    gate: &mut G,
    policy: StartupPolicy,
    report: &mut StartupReport,
) -> ServerResult<()> {
    let Err(err) = gate.open().await else {
        report.completed(stage);
        return Ok(());
    };

    tracing::error!(
        target: TRACING_TARGET_STARTUP,
        %stage,
        error = %err,
        suggestion = err.suggestion(),
        "Startup stage failed"
    );
    report.failed(stage, &err);

    match policy {
        StartupPolicy::Continue => {
            tracing::warn!(
                target: TRACING_TARGET_STARTUP,
                %stage,
                "Continuing startup after a failed stage"
            );
            Ok(())
        }
        StartupPolicy::Terminate => Err(err),
    }
}

async fn bind(
    server: &ServerConfig,
    policy: StartupPolicy,
    report: &mut StartupReport,
) -> ServerResult<Option<TcpListener>> {
    let addr = server.server_addr();

    match TcpListener::bind(addr).await {
        Ok(listener) => {
            let port = listener
                .local_addr()
                .map_or(addr.port(), |local| local.port());
            report.completed(StartupStage::Bind);

            tracing::info!(
                target: TRACING_TARGET_STARTUP,
                port,
                pid = process::id(),
                "Gig server has started"
            );

            if server.binds_to_all_interfaces() {
                tracing::warn!(
                    target: TRACING_TARGET_STARTUP,
                    "Server is bound to all interfaces. Ensure firewall rules are properly configured."
                );
            }

            Ok(Some(listener))
        }
        Err(source) => {
            let err = ServerError::bind_error(addr, source);
            tracing::error!(
                target: TRACING_TARGET_STARTUP,
                %addr,
                error = %err,
                suggestion = err.suggestion(),
                "Failed to bind to address"
            );
            report.failed(StartupStage::Bind, &err);

            match policy {
                // TODO: exit on a failed bind under `continue` once deployments restart
                // unhealthy pods; today the consumers keep running without a listener.
                StartupPolicy::Continue => Ok(None),
                StartupPolicy::Terminate => Err(err),
            }
        }
    }
}
