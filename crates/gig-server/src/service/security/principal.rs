//! Identity claims carried by end-user bearer tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded identity claims of the caller.
///
/// Lives in the request extensions for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClaims")]
pub struct Principal {
    /// Subject identifier.
    pub sub: String,
    /// Role of the caller, when the issuer sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Every other claim, verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Principal {
    /// Creates a principal with only a subject.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            role: None,
            username: None,
            email: None,
            iat: None,
            exp: None,
            extra: Map::new(),
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Returns whether the caller holds `role`.
    #[inline]
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// Subject claim as issued: auth tokens carry a numeric `id`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Subject {
    Text(String),
    Number(i64),
}

impl Subject {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawClaims {
    sub: Option<Subject>,
    id: Option<Subject>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    iat: Option<u64>,
    #[serde(default)]
    exp: Option<u64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawClaims> for Principal {
    type Error = &'static str;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let sub = raw
            .sub
            .or(raw.id)
            .ok_or("token carries neither `sub` nor `id`")?
            .into_string();

        Ok(Self {
            sub,
            role: raw.role,
            username: raw.username,
            email: raw.email,
            iat: raw.iat,
            exp: raw.exp,
            extra: raw.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_sub_and_role() -> anyhow::Result<()> {
        let principal: Principal = serde_json::from_value(json!({
            "sub": "u1",
            "role": "buyer",
        }))?;

        assert_eq!(principal.sub, "u1");
        assert!(principal.has_role("buyer"));
        assert!(principal.extra.is_empty());
        Ok(())
    }

    #[test]
    fn accepts_numeric_id() -> anyhow::Result<()> {
        let principal: Principal = serde_json::from_value(json!({
            "id": 42,
            "username": "manny",
            "email": "manny@example.com",
            "iat": 1_700_000_000u64,
        }))?;

        assert_eq!(principal.sub, "42");
        assert_eq!(principal.username.as_deref(), Some("manny"));
        assert_eq!(principal.iat, Some(1_700_000_000));
        Ok(())
    }

    #[test]
    fn keeps_unknown_claims() -> anyhow::Result<()> {
        let principal: Principal = serde_json::from_value(json!({
            "sub": "u1",
            "sellerId": "s9",
        }))?;

        assert_eq!(principal.extra.get("sellerId"), Some(&json!("s9")));
        Ok(())
    }

    #[test]
    fn rejects_missing_subject() {
        let result = serde_json::from_value::<Principal>(json!({ "role": "buyer" }));
        assert!(result.is_err());
    }
}
