//! services/api/src/web/respond.rs
//!
//! Shared error-response shapes for the REST handlers.

use axum::http::StatusCode;
use axum::Json;
use pdf_chat_core::ports::PortError;
use serde::Serialize;
use tracing::error;

/// The JSON body every failed request carries. `errors` is present only
/// for validation failures, listing the offending fields.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Serialize, Debug)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: format!("{} is required", field),
        }
    }
}

pub type Failure = (StatusCode, Json<ErrorBody>);

/// A failure with a plain message and no field detail.
pub fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
            errors: None,
        }),
    )
}

/// A 400 validation failure enumerating field-level problems.
pub fn invalid(message: impl Into<String>, errors: Vec<FieldError>) -> Failure {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
            errors: Some(errors),
        }),
    )
}

/// Logs a storage error server-side and returns an opaque 500 to the
/// client. Internals are never exposed.
pub fn storage_failure(client_message: &str, err: PortError) -> Failure {
    error!("{}: {:?}", client_message, err);
    failure(StatusCode::INTERNAL_SERVER_ERROR, client_message)
}
