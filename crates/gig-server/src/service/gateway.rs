//! Gateway certification: proof that a request came through the API gateway.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use derive_more::Deref;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::TRACING_TARGET_GATEWAY;
use crate::handler::{Error, ErrorKind, Result};

/// Header carrying the gateway certification token.
pub const GATEWAY_TOKEN_HEADER: &str = "gatewaytoken";

/// Services allowed to appear in the `id` claim of a gateway token.
pub const KNOWN_SERVICES: [&str; 8] = [
    "auth", "seller", "gig", "search", "buyer", "message", "order", "review",
];

/// Decides whether a request was certified by the API gateway.
///
/// Runs before any domain handler. Returning an error rejects the request.
pub trait GatewayVerifier: Send + Sync + 'static {
    /// Verifies the request headers.
    fn verify(&self, headers: &HeaderMap) -> Result<()>;
}

/// Shared handle to the active [`GatewayVerifier`].
#[derive(Clone, Deref)]
pub struct GatewayVerification(Arc<dyn GatewayVerifier>);

impl GatewayVerification {
    /// Wraps a verifier.
    pub fn new(verifier: impl GatewayVerifier) -> Self {
        Self(Arc::new(verifier))
    }
}

impl fmt::Debug for GatewayVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayVerification").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GatewayClaims {
    id: String,
}

/// Verifies the HS256 `gatewayToken` header issued by the gateway.
pub struct GatewayTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl GatewayTokenVerifier {
    /// Creates a verifier from the gateway signing secret.
    pub fn from_secret(secret: &str) -> crate::Result<Self> {
        if secret.is_empty() {
            return Err(crate::Error::invalid_config(
                "gateway_jwt_token",
                "signing secret cannot be empty",
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    fn rejected(reason: &'static str) -> Error<'static> {
        tracing::warn!(target: TRACING_TARGET_GATEWAY, reason, "Request rejected at gateway gate");

        ErrorKind::NotAuthorized
            .with_message("Invalid request")
            .with_coming_from("verifyGatewayRequest() method: Request not coming from api gateway")
            .with_context(reason)
    }
}

impl GatewayVerifier for GatewayTokenVerifier {
    fn verify(&self, headers: &HeaderMap) -> Result<()> {
        let token = headers
            .get(GATEWAY_TOKEN_HEADER)
            .ok_or_else(|| Self::rejected("gateway token header is missing"))?
            .to_str()
            .map_err(|_| Self::rejected("gateway token is not valid text"))?;

        if token.is_empty() {
            return Err(Self::rejected("gateway token is empty"));
        }

        let claims = decode::<GatewayClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| Self::rejected("gateway token failed verification"))?
            .claims;

        if !KNOWN_SERVICES.contains(&claims.id.as_str()) {
            return Err(Self::rejected("gateway token names an unknown service"));
        }

        Ok(())
    }
}

impl fmt::Debug for GatewayTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayTokenVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "gateway-secret";

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            GATEWAY_TOKEN_HEADER,
            HeaderValue::from_str(token).expect("valid header"),
        );
        headers
    }

    fn sign(id: &str, secret: &str) -> String {
        encode(
            &Header::default(),
            &json!({ "id": id, "iat": 1_700_000_000u64 }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token should encode")
    }

    #[test]
    fn accepts_every_known_service() -> anyhow::Result<()> {
        let verifier = GatewayTokenVerifier::from_secret(SECRET)?;
        for service in KNOWN_SERVICES {
            verifier.verify(&headers_with(&sign(service, SECRET)))?;
        }
        Ok(())
    }

    #[test]
    fn rejects_missing_header() -> anyhow::Result<()> {
        let verifier = GatewayTokenVerifier::from_secret(SECRET)?;
        let error = verifier.verify(&HeaderMap::new()).expect_err("missing header");

        assert_eq!(error.kind(), ErrorKind::NotAuthorized);
        assert_eq!(error.message(), "Invalid request");
        assert_eq!(
            error.coming_from(),
            Some("verifyGatewayRequest() method: Request not coming from api gateway")
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_service() -> anyhow::Result<()> {
        let verifier = GatewayTokenVerifier::from_secret(SECRET)?;
        let result = verifier.verify(&headers_with(&sign("billing", SECRET)));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn rejects_foreign_signature() -> anyhow::Result<()> {
        let verifier = GatewayTokenVerifier::from_secret(SECRET)?;
        let result = verifier.verify(&headers_with(&sign("gig", "not-the-gateway")));
        assert!(result.is_err());
        Ok(())
    }
}
