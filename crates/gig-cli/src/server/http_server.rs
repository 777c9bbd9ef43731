//! HTTP serving with graceful shutdown.

use std::net::SocketAddr;
use std::time::Instant;

use super::{ServerError, ServerResult, Startup, shutdown_signal};
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};

/// Serves the router on the listener startup bound.
///
/// Without a listener the process stays up until a shutdown signal, so the
/// queue consumers keep running.
pub async fn serve<Q, S>(startup: Startup<Q, S>, config: &ServerConfig) -> ServerResult<()> {
    let Startup {
        router,
        listener,
        queue,
        search,
        ..
    } = startup;

    let start_time = Instant::now();
    let shutdown = shutdown_signal(config.shutdown_timeout());

    let result = match listener {
        Some(listener) => {
            tracing::info!(
                target: TRACING_TARGET_STARTUP,
                addr = ?listener.local_addr().ok(),
                "Server is ready and listening for connections"
            );

            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Runtime)
        }
        None => {
            tracing::warn!(
                target: TRACING_TARGET_STARTUP,
                "No listener is bound; waiting for a shutdown signal"
            );
            shutdown.await;
            Ok(())
        }
    };

    drop((queue, search));

    match &result {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            uptime_secs = start_time.elapsed().as_secs(),
            "Server shut down gracefully"
        ),
        Err(err) => tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %err,
            uptime_secs = start_time.elapsed().as_secs(),
            "Server encountered an error"
        ),
    }

    result
}
