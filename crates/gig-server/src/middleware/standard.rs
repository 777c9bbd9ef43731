//! Body handling: compression, decompression and the request size bound.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use crate::TRACING_TARGET_PIPELINE;
use crate::handler::{ErrorKind, Result};

/// Default request body bound: 200 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 200 * 1024 * 1024;

/// Configuration for the standard middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StandardConfig {
    /// Largest accepted request body, in bytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "BODY_LIMIT", default_value = "209715200")
    )]
    pub body_limit: usize,
}

impl Default for StandardConfig {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl StandardConfig {
    /// Creates a configuration with the given body bound.
    pub fn with_body_limit(body_limit: usize) -> Self {
        Self { body_limit }
    }
}

/// Extension trait for `axum::`[`Router`] to apply the standard middleware.
pub trait RouterStandardExt<S> {
    /// Layers compression, decompression and the body bound.
    fn with_standard(self, config: &StandardConfig) -> Self;
}

impl<S> RouterStandardExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_standard(self, config: &StandardConfig) -> Self {
        self.layer(DefaultBodyLimit::max(config.body_limit))
            .layer(from_fn_with_state(config.body_limit, reject_oversized))
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
    }
}

/// Rejects bodies whose declared length is above the bound.
///
/// Bodies without a usable `Content-Length` are bounded by the extractors.
async fn reject_oversized(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    if let Some(length) = declared.filter(|length| *length > limit as u64) {
        tracing::warn!(
            target: TRACING_TARGET_PIPELINE,
            length,
            limit,
            "Request body exceeds the limit"
        );

        return Err(ErrorKind::FileTooLarge
            .with_message("Request body is too large")
            .with_coming_from("standard middleware: body limit exceeded"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum_test::TestServer;

    use super::*;

    fn app(limit: usize) -> Router {
        Router::new()
            .route("/upload", post(|body: String| async move { body.len().to_string() }))
            .with_standard(&StandardConfig::with_body_limit(limit))
    }

    #[test]
    fn default_limit_is_two_hundred_mebibytes() {
        assert_eq!(StandardConfig::default().body_limit, 209_715_200);
    }

    #[tokio::test]
    async fn declared_oversize_is_rejected() -> anyhow::Result<()> {
        let server = TestServer::new(app(8))?;

        let response = server.post("/upload").text("far more than eight bytes").await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        Ok(())
    }

    #[tokio::test]
    async fn bodies_within_limit_pass() -> anyhow::Result<()> {
        let server = TestServer::new(app(64))?;

        let response = server.post("/upload").text("gig").await;

        response.assert_status_ok();
        response.assert_text("3");
        Ok(())
    }
}
