//! Unified server error type.
//!
//! Every fallible handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to the same
//! `{"success": false, "message": ...}` envelope the settings endpoints use
//! on success.
//!
//! **Security note:** persistence errors are logged with full detail but only
//! a generic message is returned, so file paths never leak to clients.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::entities::CredentialError;
use crate::handlers::{SettingsError, ValidationError};

/// All errors that can occur in the relay-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeds the accepted size.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The completion API refused the submitted key.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The completion API could not be reached or answered nonsense.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// Settings could not be written.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ServerError::Upstream(m) => {
                warn!(message = %m, "upstream failure");
                (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
            }

            // Internal errors: log the full detail, return a generic message.
            ServerError::Persistence(m) => {
                error!(message = %m, "failed to persist settings");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to save settings".to_owned(),
                )
            }
        };
        (
            status,
            Json(json!({ "success": false, "message": client_message })),
        )
            .into_response()
    }
}

impl From<SettingsError> for ServerError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Credential(
                CredentialError::MultiLine | CredentialError::SingleQuote,
            ) => ServerError::BadRequest(e.to_string()),
            other => ServerError::Persistence(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::MissingKey => ServerError::BadRequest(e.to_string()),
            ValidationError::Rejected(m) => ServerError::Unauthorized(m),
            ValidationError::Transport(_) => ServerError::Upstream(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}
