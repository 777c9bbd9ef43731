//! Log output configuration.

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Output format of log records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

/// Logging configuration.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    /// Installs the global tracing subscriber.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match self.log_format {
            LogFormat::Text => registry
                .with(fmt::layer().with_target(true).with_ansi(true))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true))
                .try_init(),
        };

        result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
    }
}
