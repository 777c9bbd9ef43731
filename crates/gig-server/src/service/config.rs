//! Secrets the request pipeline verifies credentials with.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Signing secrets shared with the rest of the platform.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Secret that signs end-user bearer tokens.
    #[cfg_attr(feature = "config", arg(long = "jwt-token", env = "JWT_TOKEN"))]
    pub jwt_token: String,

    /// Secret that signs the gateway certification token.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-jwt-token", env = "GATEWAY_JWT_TOKEN")
    )]
    pub gateway_jwt_token: String,
}

impl ServiceConfig {
    /// Creates a configuration from both secrets.
    pub fn new(jwt_token: impl Into<String>, gateway_jwt_token: impl Into<String>) -> Self {
        Self {
            jwt_token: jwt_token.into(),
            gateway_jwt_token: gateway_jwt_token.into(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("jwt_token", &"<redacted>")
            .field("gateway_jwt_token", &"<redacted>")
            .finish()
    }
}
