//! Request-time errors with a builder for message, origin and context.
//!
//! Handlers, extractors and middleware return [`Error`]. Converting it into a
//! response never writes a body: the error travels to the error responder as
//! a [`PendingError`] response extension, and the responder decides how it
//! is answered.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// The error type for HTTP handlers in the server.
///
/// An error is *classified* when its kind maps to a status code and it names
/// the component it came from. Only classified errors are answered with the
/// JSON error contract.
#[derive(Clone)]
#[must_use = "errors do nothing unless returned"]
pub struct Error<'a> {
    kind: ErrorKind,
    message: Option<Cow<'a, str>>,
    coming_from: Option<Cow<'a, str>>,
    context: Option<Cow<'a, str>>,
}

impl Error<'static> {
    /// Creates a new [`Error`] with the specified kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            coming_from: None,
            context: None,
        }
    }
}

impl<'a> Error<'a> {
    /// Sets the client-facing message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Names the component that raised the error.
    #[inline]
    pub fn with_coming_from(self, coming_from: impl Into<Cow<'a, str>>) -> Self {
        Self {
            coming_from: Some(coming_from.into()),
            ..self
        }
    }

    /// Attaches diagnostic context. Logged, never sent to the client.
    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'a, str>>) -> Self {
        Self {
            context: Some(context.into()),
            ..self
        }
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message, falling back to the kind's default.
    #[inline]
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }

    /// Returns the originating component if present.
    #[inline]
    pub fn coming_from(&self) -> Option<&str> {
        self.coming_from.as_deref()
    }

    /// Returns the context if present.
    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns the status code when the kind carries one.
    #[inline]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.kind.status_code()
    }

    /// Whether the error carries both a status code and its origin.
    #[inline]
    pub fn is_classified(&self) -> bool {
        self.status_code().is_some() && self.coming_from.is_some()
    }

    /// Converts this error into a static version by cloning all borrowed data.
    pub fn into_static(self) -> Error<'static> {
        Error {
            kind: self.kind,
            message: self.message.map(|m| Cow::Owned(m.into_owned())),
            coming_from: self.coming_from.map(|c| Cow::Owned(c.into_owned())),
            context: self.context.map(|c| Cow::Owned(c.into_owned())),
        }
    }
}

impl Default for Error<'static> {
    #[inline]
    fn default() -> Self {
        Self::new(ErrorKind::default())
    }
}

impl fmt::Debug for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("status", &self.status_code())
            .field("message", &self.message())
            .field("coming_from", &self.coming_from)
            .field("context", &self.context)
            .finish()
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code() {
            Some(status) => write!(f, "{} ({}): {}", self.kind, status.as_u16(), self.message())?,
            None => write!(f, "{}: {}", self.kind, self.message())?,
        }

        if let Some(ref coming_from) = self.coming_from {
            write!(f, " [from: {coming_from}]")?;
        }

        if let Some(ref context) = self.context {
            write!(f, " - {context}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

/// An error waiting for the error responder.
///
/// Attached to the response produced by [`Error::into_response`].
#[derive(Debug, Clone)]
pub struct PendingError(pub Error<'static>);

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        let status = self
            .status_code()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = status.into_response();
        response
            .extensions_mut()
            .insert(PendingError(self.into_static()));
        response
    }
}

impl From<ErrorKind> for Error<'static> {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized [`Result`] type for request handling.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// The error family shared across the platform's services.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    NotAuthorized,
    /// 404 Not Found
    NotFound,
    /// 413 Payload Too Large
    FileTooLarge,
    /// 503 Service Unavailable
    ServerError,
    /// 500 Internal Server Error, raised by recovery
    #[default]
    Internal,
    /// An error without a status code.
    Unclassified,
}

impl ErrorKind {
    /// Converts this error kind into a full [`Error`].
    #[inline]
    pub fn into_error(self) -> Error<'static> {
        Error::new(self)
    }

    /// Creates an [`Error`] with the specified message.
    #[inline]
    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    /// Creates an [`Error`] naming its originating component.
    #[inline]
    pub fn with_coming_from<'a>(self, coming_from: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_coming_from(coming_from)
    }

    /// Creates an [`Error`] with the specified context.
    #[inline]
    pub fn with_context<'a>(self, context: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_context(context)
    }

    /// Returns the HTTP status code for this error kind.
    pub const fn status_code(self) -> Option<StatusCode> {
        match self {
            Self::BadRequest => Some(StatusCode::BAD_REQUEST),
            Self::NotAuthorized => Some(StatusCode::UNAUTHORIZED),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::FileTooLarge => Some(StatusCode::PAYLOAD_TOO_LARGE),
            Self::ServerError => Some(StatusCode::SERVICE_UNAVAILABLE),
            Self::Internal => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Unclassified => None,
        }
    }

    /// Message used when the error does not set one.
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::NotAuthorized => "Not authorized",
            Self::NotFound => "Not found",
            Self::FileTooLarge => "File too large",
            Self::ServerError => "Service unavailable",
            Self::Internal => "Internal server error",
            Self::Unclassified => "Unexpected error",
        }
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        Error::new(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_error_is_internal() {
        let error = Error::default();
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert_eq!(error.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn kinds_map_to_shared_status_codes() {
        let expected = [
            (ErrorKind::BadRequest, 400),
            (ErrorKind::NotAuthorized, 401),
            (ErrorKind::NotFound, 404),
            (ErrorKind::FileTooLarge, 413),
            (ErrorKind::ServerError, 503),
            (ErrorKind::Internal, 500),
        ];
        for (kind, status) in expected {
            assert_eq!(kind.status_code().map(|s| s.as_u16()), Some(status));
        }
        assert_eq!(ErrorKind::Unclassified.status_code(), None);
    }

    #[test]
    fn classification_needs_status_and_origin() {
        assert!(!ErrorKind::NotFound.into_error().is_classified());
        assert!(ErrorKind::NotFound.with_coming_from("routes").is_classified());
        assert!(!ErrorKind::Unclassified.with_coming_from("routes").is_classified());
    }

    #[test]
    fn builder_chaining() {
        let error = ErrorKind::BadRequest
            .with_message("Invalid gig")
            .with_coming_from("create() method")
            .with_context("title missing");

        assert_eq!(error.message(), "Invalid gig");
        assert_eq!(error.coming_from(), Some("create() method"));
        assert_eq!(error.context(), Some("title missing"));
    }

    #[test]
    fn message_falls_back_to_kind_default() {
        assert_eq!(ErrorKind::FileTooLarge.into_error().message(), "File too large");
    }

    #[test]
    fn display_includes_status_and_origin() {
        let error = ErrorKind::NotAuthorized
            .with_message("Invalid request")
            .with_coming_from("gateway");

        let display = error.to_string();
        assert!(display.contains("not_authorized"));
        assert!(display.contains("401"));
        assert!(display.contains("Invalid request"));
        assert!(display.contains("gateway"));
    }

    #[test]
    fn into_response_defers_the_body() {
        let response = ErrorKind::NotFound
            .with_coming_from("routes")
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let pending = response.extensions().get::<PendingError>();
        assert!(pending.is_some_and(|PendingError(error)| error.kind() == ErrorKind::NotFound));
    }

    #[test]
    fn into_static_keeps_fields() {
        let message = String::from("owned");
        let error = ErrorKind::BadRequest
            .with_message(message.as_str())
            .with_coming_from("test")
            .into_static();

        assert_eq!(error.message(), "owned");
        assert_eq!(error.coming_from(), Some("test"));
    }
}
