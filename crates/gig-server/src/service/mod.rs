//! Application state and dependency injection.

mod config;
mod gateway;
mod security;

pub use crate::service::config::ServiceConfig;
pub use crate::service::gateway::{
    GATEWAY_TOKEN_HEADER, GatewayTokenVerifier, GatewayVerification, GatewayVerifier,
    KNOWN_SERVICES,
};
pub use crate::service::security::{Principal, PrincipalKeys};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub principal_keys: PrincipalKeys,
    pub gateway: GatewayVerification,
}

impl ServiceState {
    /// Creates state from already built collaborators.
    pub fn new(principal_keys: PrincipalKeys, gateway: GatewayVerification) -> Self {
        Self {
            principal_keys,
            gateway,
        }
    }

    /// Initializes application state from configuration.
    pub fn from_config(config: &ServiceConfig) -> crate::Result<Self> {
        let principal_keys = PrincipalKeys::from_secret(&config.jwt_token)?;
        let verifier = GatewayTokenVerifier::from_secret(&config.gateway_jwt_token)?;

        Ok(Self::new(principal_keys, GatewayVerification::new(verifier)))
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(principal_keys: PrincipalKeys);
impl_di!(gateway: GatewayVerification);
