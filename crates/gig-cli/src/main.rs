#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use gig_queue::JetStreamConnector;
use gig_queue::consumer::TracingHandler;
use gig_server::handler::DomainRoutes;
use gig_server::middleware::default_fallback;
use gig_server::service::ServiceState;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Cli;
use crate::server::{LifecycleController, QueueGate, SearchGate};

/// Tracing target for startup events.
pub const TRACING_TARGET_STARTUP: &str = "gig_cli::startup";

/// Tracing target for shutdown events.
pub const TRACING_TARGET_SHUTDOWN: &str = "gig_cli::shutdown";

/// Tracing target for configuration logging.
pub const TRACING_TARGET_CONFIG: &str = "gig_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    cli.telemetry.init_tracing()?;
    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let state = ServiceState::from_config(&cli.service).context("failed to create service state")?;

    let queue = QueueGate::new(JetStreamConnector::new(
        cli.queue.clone(),
        Arc::new(TracingHandler::new("gig-update")),
        Arc::new(TracingHandler::new("seed")),
        shutdown.clone(),
        tracker.clone(),
    ));
    let search = SearchGate::from_config(&cli.search).context("failed to create search client")?;

    let startup = LifecycleController::new(cli.server.clone(), cli.middleware.clone(), state)
        .with_routes(DomainRoutes::new())
        .with_fallback(default_fallback)
        .start(queue, search)
        .await?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        ready = startup.report.is_ready(),
        stages = ?startup.report.stages(),
        "Startup sequence finished"
    );

    let served = server::serve(startup, &cli.server).await;

    shutdown.cancel();
    tracker.close();
    if tokio::time::timeout(cli.server.shutdown_timeout(), tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            timeout_secs = cli.server.shutdown_timeout,
            "Consumers did not stop before the shutdown timeout"
        );
    }

    served?;
    Ok(())
}
