//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # Host, port, shutdown, startup policy
//! ├── middleware: MiddlewareConfig  # Gateway origin, proxy hops, body limit, timeout
//! ├── service: ServiceConfig        # Signing secrets
//! ├── queue: QueueConfig            # NATS connection
//! ├── search: SearchConfig          # Search engine and index
//! └── telemetry: TelemetryConfig    # Log format
//! ```
//!
//! Every option can be given as a flag or an environment variable.

mod middleware;
mod server;
mod telemetry;

use std::process;

use anyhow::Context;
use clap::Parser;
use gig_queue::QueueConfig;
use gig_search::SearchConfig;
use gig_server::service::ServiceConfig;
pub use middleware::MiddlewareConfig;
use serde::{Deserialize, Serialize};
pub use server::{ServerConfig, StartupPolicy};
pub use telemetry::{LogFormat, TelemetryConfig};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "gig-service")]
#[command(about = "Gig microservice")]
#[command(version)]
pub struct Cli {
    /// Listener and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Request pipeline configuration.
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Signing secrets.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Message broker connection.
    #[clap(flatten)]
    pub queue: QueueConfig,

    /// Search engine connection.
    #[clap(flatten)]
    pub search: SearchConfig,

    /// Log output.
    #[clap(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Cli {
    /// Loads `.env` (when enabled) and parses arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.queue.validate().context("invalid queue configuration")?;
        self.search
            .validate()
            .context("invalid search configuration")?;
        Ok(())
    }

    /// Logs configuration without secrets.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            dotenv = cfg!(feature = "dotenv"),
            "Build information"
        );

        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            nats_url = %self.queue.nats_url,
            elastic_search_url = %self.search.elastic_search_url,
            search_index = %self.search.search_index,
            log_format = ?self.telemetry.log_format,
            "Collaborator configuration"
        );
    }
}
