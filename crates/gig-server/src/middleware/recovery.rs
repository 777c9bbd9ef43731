//! Recovery middleware for timeouts and panics.
//!
//! Both conditions become classified [`ErrorKind::Internal`] errors, so the
//! error responder answers them with the JSON contract.

use std::any::Any;
use std::future::ready;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::catch_panic::CatchPanicLayer;

use crate::TRACING_TARGET_ERROR;
use crate::handler::{Error, ErrorKind};

type ResponseFut = BoxFuture<'static, Response>;
type Panic = Box<dyn Any + Send + 'static>;

/// Configuration for the recovery middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Seconds a request may run before it is answered with a 500.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value = "60")
    )]
    pub request_timeout: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: 60,
        }
    }
}

impl RecoveryConfig {
    /// Creates a configuration with the given timeout in seconds.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: secs,
        }
    }

    /// Returns the request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Layers timeout and panic recovery.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(CatchPanicLayer::custom(catch_panic))
            .layer(TimeoutLayer::new(config.request_timeout()));

        self.layer(middlewares)
    }
}

fn handle_error(err: tower::BoxError) -> ResponseFut {
    let error = if err.is::<Elapsed>() {
        tracing::error!(target: TRACING_TARGET_ERROR, error = %err, "Request timeout exceeded");

        ErrorKind::Internal
            .with_message("Request timeout")
            .with_coming_from("recovery: request timed out")
    } else {
        tracing::error!(target: TRACING_TARGET_ERROR, error = %err, "Unhandled middleware error");

        ErrorKind::Internal
            .with_coming_from("recovery: middleware failure")
            .with_context(err.to_string())
    };

    ready(error.into_response()).boxed()
}

fn catch_panic(err: Panic) -> Response {
    if let Some(error) = err.downcast_ref::<Error<'static>>() {
        tracing::error!(target: TRACING_TARGET_ERROR, error = %error, "Service panic");
        return error.clone().into_response();
    }

    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(target: TRACING_TARGET_ERROR, message, "Service panic");

    ErrorKind::Internal
        .with_coming_from("recovery: handler panicked")
        .with_context(message.to_owned())
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::handler::PendingError;

    #[test]
    fn panic_becomes_classified_internal_error() {
        let response = catch_panic(Box::new("boom"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let pending = response.extensions().get::<PendingError>();
        assert!(pending.is_some_and(|PendingError(error)| {
            error.is_classified() && error.context() == Some("boom")
        }));
    }

    #[tokio::test]
    async fn timeout_is_reported_as_internal() {
        let response = handle_error(Box::new(Elapsed::new())).await;

        let pending = response.extensions().get::<PendingError>();
        assert!(pending.is_some_and(|PendingError(error)| error.message() == "Request timeout"));
    }

    #[test]
    fn default_timeout_is_one_minute() {
        assert_eq!(
            RecoveryConfig::default().request_timeout(),
            Duration::from_secs(60)
        );
    }
}
