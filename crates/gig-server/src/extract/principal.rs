//! Access to the caller's [`Principal`].

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use derive_more::{Deref, From};

use crate::handler::{Error, ErrorKind};
use crate::service::Principal;

/// The authenticated caller.
///
/// Fails with a classified 401 when the request carried no bearer token.
/// Use `Option<AuthPrincipal>` for routes that also serve anonymous callers.
///
/// ```rust,ignore
/// async fn create_gig(AuthPrincipal(principal): AuthPrincipal) -> String {
///     principal.sub
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deref, From)]
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or_else(|| {
                ErrorKind::NotAuthorized
                    .with_message("Authentication is required")
                    .with_coming_from("AuthPrincipal: request carries no principal")
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Principal>().cloned().map(Self))
    }
}
