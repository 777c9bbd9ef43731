//! Route mounting and the request-time error contract.
//!
//! Domain routes are supplied by the embedding application through
//! [`DomainRoutes`] and mounted under [`BASE_PATH`] behind the gateway gate.
//! The liveness probe at [`HEALTH_PATH`] stays outside the gate.

mod error;
mod health;
mod response;

use axum::Router;
use axum::middleware::from_fn_with_state;

pub use crate::handler::error::{Error, ErrorKind, PendingError, Result};
pub use crate::handler::health::HEALTH_PATH;
pub use crate::handler::response::{ERROR_STATUS, ErrorResponse};
use crate::middleware::verify_gateway;
use crate::service::ServiceState;

/// Prefix under which every domain route is mounted.
pub const BASE_PATH: &str = "/api/v1/gig";

/// Domain routes injected by the embedding application.
///
/// Paths are relative to [`BASE_PATH`].
#[derive(Debug, Default, Clone)]
pub struct DomainRoutes {
    router: Router<ServiceState>,
}

impl DomainRoutes {
    /// Creates an empty set of domain routes.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `routes` into the domain routes.
    pub fn with_routes(self, routes: Router<ServiceState>) -> Self {
        Self {
            router: self.router.merge(routes),
        }
    }

    /// Returns the underlying router.
    #[inline]
    pub fn into_router(self) -> Router<ServiceState> {
        self.router
    }
}

async fn not_found() -> Error<'static> {
    ErrorKind::NotFound
        .with_message("Route not found")
        .with_coming_from("routes: no handler matched the request path")
}

/// Returns the complete application [`Router`].
///
/// The gateway gate wraps the nested domain router, including its fallback,
/// so an uncertified request never learns which domain paths exist.
pub fn routes(domain: DomainRoutes, state: ServiceState) -> Router {
    let gated = domain
        .into_router()
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), verify_gateway));

    Router::new()
        .merge(health::routes())
        .nest(BASE_PATH, gated)
        .fallback(not_found)
        .with_state(state)
}
