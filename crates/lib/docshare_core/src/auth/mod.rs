//! Authentication and authorization logic.
//!
//! Provides password hashing, session credential issuance, the role policy,
//! and identity registry queries used by `docshare_api`.

pub mod jwt;
pub mod password;
pub mod policy;
pub mod queries;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    CredentialError,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Credential has expired")]
    ExpiredCredential,

    #[error("Identity already registered: {0}")]
    DuplicateIdentity(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
