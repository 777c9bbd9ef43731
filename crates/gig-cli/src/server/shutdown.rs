//! Termination signals that stop the HTTP listener.

use std::future::pending;
use std::io;
use std::time::Duration;

use strum::Display;

use crate::TRACING_TARGET_SHUTDOWN;

/// Signal that ended the serving phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum StopSignal {
    #[strum(to_string = "SIGINT")]
    Interrupt,
    #[strum(to_string = "SIGTERM")]
    Terminate,
}

/// Parks forever when a handler could not be installed, so the other
/// signal source still decides.
async fn wait_or_park<F>(signal: StopSignal, received: F) -> StopSignal
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = received.await {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            signal = %signal,
            error = %err,
            "Signal handler unavailable"
        );
        pending::<()>().await;
    }
    signal
}

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> io::Result<()> {
    pending().await
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// `grace` is only reported here; the caller enforces it while draining.
pub async fn shutdown_signal(grace: Duration) {
    let received = tokio::select! {
        signal = wait_or_park(StopSignal::Interrupt, tokio::signal::ctrl_c()) => signal,
        signal = wait_or_park(StopSignal::Terminate, terminate()) => signal,
    };

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        signal = %received,
        grace_secs = grace.as_secs(),
        "Stopping listener, draining in-flight requests"
    );
}
