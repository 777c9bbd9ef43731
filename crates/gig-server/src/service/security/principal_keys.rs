//! Verification key for end-user bearer tokens.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use super::Principal;
use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{ErrorKind, Result};

/// Shared HS256 key and validation rules for bearer tokens.
///
/// `exp` is checked when present but not required; `iat`-only tokens are
/// accepted.
#[derive(Clone)]
pub struct PrincipalKeys {
    inner: Arc<PrincipalKeysInner>,
}

struct PrincipalKeysInner {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl PrincipalKeys {
    /// Creates keys from the shared signing secret.
    pub fn from_secret(secret: &str) -> crate::Result<Self> {
        if secret.is_empty() {
            return Err(crate::Error::invalid_config(
                "jwt_token",
                "signing secret cannot be empty",
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        let inner = PrincipalKeysInner {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Verifies `token` and decodes its claims.
    ///
    /// Any failure is a classified 401.
    pub fn decode(&self, token: &str) -> Result<Principal> {
        let data = decode::<Principal>(token, &self.inner.decoding_key, &self.inner.validation)
            .map_err(|err| {
                let reason = match err.kind() {
                    JwtErrorKind::ExpiredSignature => "token has expired",
                    JwtErrorKind::InvalidSignature => "signature does not match",
                    JwtErrorKind::InvalidAlgorithm => "unexpected signing algorithm",
                    JwtErrorKind::Json(_) => "claims could not be decoded",
                    _ => "token is malformed",
                };

                tracing::debug!(
                    target: TRACING_TARGET_AUTHENTICATION,
                    error = %err,
                    reason,
                    "Bearer token rejected"
                );

                ErrorKind::NotAuthorized
                    .with_message("Token is not available. Please login again.")
                    .with_coming_from("principal extraction: invalid bearer token")
                    .with_context(reason)
            })?;

        Ok(data.claims)
    }
}

impl fmt::Debug for PrincipalKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrincipalKeys").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "user-secret";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }

    fn sign(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token should encode")
    }

    #[test]
    fn decodes_valid_token() -> anyhow::Result<()> {
        let keys = PrincipalKeys::from_secret(SECRET)?;
        let token = sign(json!({ "sub": "u1", "role": "buyer" }), SECRET);

        let principal = keys.decode(&token)?;
        assert_eq!(principal.sub, "u1");
        assert_eq!(principal.role.as_deref(), Some("buyer"));
        Ok(())
    }

    #[test]
    fn accepts_token_without_exp() -> anyhow::Result<()> {
        let keys = PrincipalKeys::from_secret(SECRET)?;
        let token = sign(json!({ "id": 7, "iat": now() }), SECRET);

        assert_eq!(keys.decode(&token)?.sub, "7");
        Ok(())
    }

    #[test]
    fn rejects_wrong_signature() -> anyhow::Result<()> {
        let keys = PrincipalKeys::from_secret(SECRET)?;
        let token = sign(json!({ "sub": "u1" }), "someone-else");

        let error = keys.decode(&token).expect_err("signature mismatch");
        assert_eq!(error.kind(), ErrorKind::NotAuthorized);
        assert!(error.is_classified());
        Ok(())
    }

    #[test]
    fn rejects_expired_token() -> anyhow::Result<()> {
        let keys = PrincipalKeys::from_secret(SECRET)?;
        let token = sign(json!({ "sub": "u1", "exp": now() - 3600 }), SECRET);

        let error = keys.decode(&token).expect_err("expired");
        assert_eq!(error.context(), Some("token has expired"));
        Ok(())
    }

    #[test]
    fn rejects_garbage() -> anyhow::Result<()> {
        let keys = PrincipalKeys::from_secret(SECRET)?;
        assert!(keys.decode("not-a-token").is_err());
        Ok(())
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        assert!(PrincipalKeys::from_secret("").is_err());
    }
}
