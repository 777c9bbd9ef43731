//! Url-encoded form extractor with duplicate-key protection.

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form as AxumForm, FromRequest, Request};
use axum::http::{Method, header};
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;

use super::body_rejection;
use crate::handler::{Error, ErrorKind};
use crate::middleware::dedupe_params;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// [`axum::Form`] with classified rejections.
///
/// Repeated keys resolve to their last value before deserialization, the
/// same rule the parameter pollution middleware applies to query strings.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Returns the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for Form<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumForm(pairs) = AxumForm::<Vec<(String, String)>>::from_request(req, state).await?;
        let (pairs, _) = dedupe_params(pairs);

        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();

        let request = Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Body::from(encoded))
            .map_err(|err| {
                ErrorKind::Internal
                    .with_coming_from("Form extractor: could not rebuild request")
                    .with_context(err.to_string())
            })?;

        let AxumForm(value) = AxumForm::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

impl From<FormRejection> for Error<'static> {
    fn from(rejection: FormRejection) -> Self {
        body_rejection(
            rejection.status(),
            rejection.body_text(),
            "Form extractor: request body rejected",
        )
    }
}
