//! The terminal error responder.
//!
//! Handlers and middleware return [`Error`], whose response carries the
//! error as a [`PendingError`] extension and no body. This middleware is the
//! only place a client-facing error body is written:
//!
//! - a classified error (status code and origin) is answered with the JSON
//!   [`ErrorResponse`] contract,
//! - anything else is forwarded to the [`FallbackHandler`].
//!
//! Headers set by inner layers (CORS, hardening) are kept in both cases.

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::response::Parts;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::TRACING_TARGET_ERROR;
use crate::handler::{Error, ErrorResponse, PendingError};

/// Answers errors the responder does not render itself.
pub type FallbackHandler = fn(Error<'static>) -> Response;

/// Plain `500 Internal Server Error`, without the JSON contract.
pub fn default_fallback(_error: Error<'static>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// Extension trait for `axum::`[`Router`] to install the error responder.
pub trait RouterErrorResponderExt<S> {
    /// Layers the error responder, forwarding unclassified errors to `fallback`.
    ///
    /// Must be the outermost layer so every pending error reaches it.
    fn with_error_responder(self, fallback: FallbackHandler) -> Self;
}

impl<S> RouterErrorResponderExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_error_responder(self, fallback: FallbackHandler) -> Self {
        self.layer(from_fn_with_state(fallback, respond))
    }
}

async fn respond(
    State(fallback): State<FallbackHandler>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(PendingError(error)) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    log_error(&error);

    let rendered = ErrorResponse::from_error(&error)
        .map(|body| serde_json::to_vec(&body).map(|json| (body.status(), json)));

    let (mut parts, _) = response.into_parts();
    match rendered {
        Some(Ok((status, json))) => {
            parts.status = status;
            parts.headers.remove(CONTENT_LENGTH);
            parts.headers.remove(CONTENT_ENCODING);
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Response::from_parts(parts, Body::from(Bytes::from(json)))
        }
        Some(Err(err)) => {
            tracing::error!(
                target: TRACING_TARGET_ERROR,
                error = %err,
                "Could not serialize error response"
            );
            forward(parts, fallback(error))
        }
        None => forward(parts, fallback(error)),
    }
}

fn log_error(error: &Error<'_>) {
    let coming_from = error.coming_from().unwrap_or("unclassified");
    let status = error.status_code().map(|status| status.as_u16());

    if status.is_none_or(|status| status >= 500) {
        tracing::error!(
            target: TRACING_TARGET_ERROR,
            kind = %error.kind(),
            status,
            coming_from,
            message = error.message(),
            context = error.context(),
            "GigService error"
        );
    } else {
        tracing::warn!(
            target: TRACING_TARGET_ERROR,
            kind = %error.kind(),
            status,
            coming_from,
            message = error.message(),
            context = error.context(),
            "GigService error"
        );
    }
}

/// Copies upstream headers the fallback response did not set itself.
fn forward(upstream: Parts, mut response: Response) -> Response {
    let mut upstream = upstream.headers;
    upstream.remove(CONTENT_LENGTH);
    upstream.remove(CONTENT_TYPE);
    upstream.remove(CONTENT_ENCODING);

    let headers = response.headers_mut();
    let mut current = None;
    for (name, value) in upstream {
        if let Some(name) = name {
            current = (!headers.contains_key(&name)).then_some(name);
        }
        if let Some(name) = &current {
            headers.append(name.clone(), value);
        }
    }

    response
}
