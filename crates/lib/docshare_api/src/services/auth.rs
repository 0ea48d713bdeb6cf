//! Authentication service — signup/login/refresh flows delegating to
//! `docshare_core::auth`.

use docshare_core::auth::AuthError;
use docshare_core::auth::jwt::{CredentialIssuer, SessionSubject};
use docshare_core::auth::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use docshare_core::auth::queries;
use docshare_core::models::auth::{Identity, TokenKind};
use sqlx::PgPool;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{SignupRequest, TokenResponse};

/// Client metadata recorded with each successful login.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Reject malformed signup input before touching the database.
pub fn validate_signup(req: &SignupRequest) -> AppResult<()> {
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if !is_plausible_email(&req.email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Register a new identity and issue its first token pair.
///
/// Tokens minted here carry the subject only; the role claim is added at login.
pub async fn signup(
    pool: &PgPool,
    issuer: &CredentialIssuer,
    req: &SignupRequest,
) -> AppResult<TokenResponse> {
    validate_signup(req)?;

    if queries::username_exists(pool, &req.username).await? {
        return Err(AppError::Validation("Username already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let identity = queries::create_identity(
        pool,
        &req.username,
        &req.email,
        &password_hash,
        req.user_type,
    )
    .await?;
    info!(username = %identity.username, role = %identity.role, "identity registered");

    let pair = issuer.issue_pair(&SessionSubject::new(&identity.username, None))?;
    Ok(pair.into())
}

/// Authenticate with username + password, appending a login event on success.
pub async fn login(
    pool: &PgPool,
    issuer: &CredentialIssuer,
    username: &str,
    password: &str,
    ctx: &LoginContext,
) -> AppResult<TokenResponse> {
    let found = queries::find_identity_by_username(pool, username).await?;

    // Same error for unknown user and wrong password.
    let Some(found) = found else {
        return Err(AuthError::CredentialError.into());
    };
    if !verify_password(password, &found.password_hash)? {
        return Err(AuthError::CredentialError.into());
    }

    let identity = found.identity;
    queries::record_login(
        pool,
        identity.id,
        ctx.user_agent.as_deref(),
        ctx.ip_address.as_deref(),
    )
    .await?;
    info!(username = %identity.username, ip = ?ctx.ip_address, "login succeeded");

    let pair = issuer.issue_pair(&SessionSubject::new(
        &identity.username,
        Some(identity.role),
    ))?;
    Ok(pair.into())
}

/// Exchange a refresh token for a fresh pair. The old token stays valid
/// until its own expiry.
pub async fn refresh(
    pool: &PgPool,
    issuer: &CredentialIssuer,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let claims = issuer.verify_kind(refresh_token, TokenKind::Refresh)?;
    let identity = load_active_identity(pool, &claims.sub).await?;

    let pair = issuer.issue_pair(&SessionSubject::new(
        &identity.username,
        Some(identity.role),
    ))?;
    Ok(pair.into())
}

/// Resolve a token subject to an active identity.
pub async fn load_active_identity(pool: &PgPool, username: &str) -> AppResult<Identity> {
    let identity = queries::find_identity_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".into()))?
        .identity;
    if !identity.is_active {
        return Err(AppError::Unauthorized("Inactive user".into()));
    }
    Ok(identity)
}
