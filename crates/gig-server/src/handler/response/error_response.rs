use std::borrow::Cow;

use axum::http::StatusCode;
use serde::Serialize;

use crate::handler::Error;

/// Short label carried in the `status` field of every error body.
pub const ERROR_STATUS: &str = "error";

/// The JSON error contract shared by every route.
///
/// Only the error responder serializes this body; handlers return
/// [`Error`] instead.
///
/// ```json
/// { "message": "...", "statusCode": 401, "status": "error", "comingFrom": "..." }
/// ```
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse<'a> {
    /// Client-facing message.
    pub message: Cow<'a, str>,
    /// HTTP status code, repeated in the body.
    pub status_code: u16,
    /// Always [`ERROR_STATUS`].
    pub status: Cow<'a, str>,
    /// Component that raised the error.
    pub coming_from: Cow<'a, str>,
}

impl<'a> ErrorResponse<'a> {
    /// Builds the body for a classified error; `None` when unclassified.
    pub fn from_error(error: &'a Error<'_>) -> Option<Self> {
        let status = error.status_code()?;
        let coming_from = error.coming_from()?;

        Some(Self {
            message: Cow::Borrowed(error.message()),
            status_code: status.as_u16(),
            status: Cow::Borrowed(ERROR_STATUS),
            coming_from: Cow::Borrowed(coming_from),
        })
    }

    /// Returns the HTTP status code of the body.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handler::ErrorKind;

    #[test]
    fn serializes_camel_case_contract() -> anyhow::Result<()> {
        let error = ErrorKind::NotAuthorized
            .with_message("Invalid request")
            .with_coming_from("verifyGatewayRequest() method");
        let body = ErrorResponse::from_error(&error).expect("classified");

        assert_eq!(
            serde_json::to_value(&body)?,
            json!({
                "message": "Invalid request",
                "statusCode": 401,
                "status": "error",
                "comingFrom": "verifyGatewayRequest() method",
            })
        );
        Ok(())
    }

    #[test]
    fn unclassified_errors_have_no_body() {
        let without_origin = ErrorKind::BadRequest.with_message("no origin");
        assert!(ErrorResponse::from_error(&without_origin).is_none());

        let without_status = ErrorKind::Unclassified.with_coming_from("somewhere");
        assert!(ErrorResponse::from_error(&without_status).is_none());
    }

    #[test]
    fn default_message_is_used() {
        let error = ErrorKind::FileTooLarge.with_coming_from("body limit");
        let body = ErrorResponse::from_error(&error).expect("classified");
        assert_eq!(body.message, "File too large");
        assert_eq!(body.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
