//! Application error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use docshare_core::auth::AuthError;
use docshare_core::auth::policy::AccessDenied;
use docshare_core::files::FileError;
use docshare_core::storage::StorageError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Dependency failure. The first field is the client-facing message, the
    /// second the underlying cause, which is only logged.
    #[error("Internal server error: {1}")]
    Internal(&'static str, String),
}

impl AppError {
    /// Generic dependency failure with the default client-facing message.
    pub fn internal(cause: impl Into<String>) -> Self {
        AppError::Internal("Internal server error", cause.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::PayloadTooLarge(m) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", m.as_str())
            }
            AppError::Internal(public, cause) => {
                error!(%cause, "{public}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", *public)
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            detail: detail.to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => {
                AppError::Unauthorized("Incorrect username or password".into())
            }
            AuthError::InvalidCredential => {
                AppError::Unauthorized("Could not validate credentials".into())
            }
            AuthError::ExpiredCredential => AppError::Unauthorized("Token has expired".into()),
            AuthError::DuplicateIdentity(field) => {
                let label = match field.as_str() {
                    "email" => "Email",
                    _ => "Username",
                };
                AppError::Validation(format!("{label} already registered"))
            }
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::internal(msg),
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(e: AccessDenied) -> Self {
        match e {
            AccessDenied::Unauthenticated(_) => {
                AppError::Unauthorized("Not authenticated".into())
            }
            AccessDenied::Denied { reason, .. } => AppError::Forbidden(capitalize(reason)),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Write(cause) => AppError::Internal("Error uploading file", cause),
            StorageError::NotFound(key) => AppError::Internal(
                "Error generating download URL",
                format!("object missing from store: {key}"),
            ),
            StorageError::Access(cause) => {
                AppError::Internal("Error generating download URL", cause)
            }
        }
    }
}

impl From<FileError> for AppError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::NotFound(_) => AppError::NotFound("File not found".into()),
            FileError::InvalidRecord(msg) => AppError::internal(msg),
            FileError::DbError(e) => AppError::from(e),
            FileError::Storage(e) => AppError::from(e),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
