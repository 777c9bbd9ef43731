//! Body extractors whose rejections are classified errors.

mod form;
mod json;

pub use form::Form;
pub use json::Json;

use axum::http::StatusCode;

use crate::handler::{Error, ErrorKind};

/// Maps an axum body rejection onto the shared error family.
///
/// Bodies over the limit become 413; everything else the client sent wrong
/// becomes 400.
pub(crate) fn body_rejection(
    status: StatusCode,
    body_text: String,
    coming_from: &'static str,
) -> Error<'static> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return ErrorKind::FileTooLarge
            .with_message("Request body exceeds the allowed size")
            .with_coming_from(coming_from)
            .with_context(body_text);
    }

    let kind = if status.is_server_error() {
        ErrorKind::Internal
    } else {
        ErrorKind::BadRequest
    };

    kind.with_message("Invalid request body")
        .with_coming_from(coming_from)
        .with_context(body_text)
}
