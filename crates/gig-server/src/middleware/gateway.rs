//! The trust-boundary gate.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::handler::Result;
use crate::service::GatewayVerification;

/// Rejects requests the gateway did not certify, before any handler runs.
pub async fn verify_gateway(
    State(gateway): State<GatewayVerification>,
    request: Request,
    next: Next,
) -> Result<Response> {
    gateway.verify(request.headers())?;
    Ok(next.run(request).await)
}
