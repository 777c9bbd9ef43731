//! Liveness probe, mounted outside the trust boundary.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

use crate::service::ServiceState;

/// Path of the liveness probe.
pub const HEALTH_PATH: &str = "/gig-health";

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Gig service is healthy and OK.")
}

/// Returns a [`Router`] with the liveness probe.
pub fn routes() -> Router<ServiceState> {
    Router::new().route(HEALTH_PATH, get(health))
}
