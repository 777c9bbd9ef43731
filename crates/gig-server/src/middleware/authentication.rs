//! Principal extraction from the `Authorization` header.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{ErrorKind, Result};
use crate::service::PrincipalKeys;

/// Attaches the caller's [`Principal`] when an `Authorization` header is sent.
///
/// The credential is the second whitespace-separated token of the header.
/// Requests without the header continue unauthenticated; a header that does
/// not verify fails the request with a classified 401.
///
/// [`Principal`]: crate::service::Principal
pub async fn extract_principal(
    State(keys): State<PrincipalKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        let credential = value
            .to_str()
            .ok()
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or_else(|| {
                ErrorKind::NotAuthorized
                    .with_message("Token is not available. Please login again.")
                    .with_coming_from("principal extraction: malformed authorization header")
            })?;

        let principal = keys.decode(credential)?;

        tracing::trace!(
            target: TRACING_TARGET_AUTHENTICATION,
            subject = %principal.sub,
            "Principal attached"
        );

        request.extensions_mut().insert(principal);
    }

    Ok(next.run(request).await)
}
