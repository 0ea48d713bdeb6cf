//! Authentication middleware — Bearer token extraction and verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use docshare_core::models::auth::{Identity, TokenKind};

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::load_active_identity;

/// Verified caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Current registry record for the token subject. Its role is the one
    /// the policy checks.
    pub identity: Identity,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Axum middleware: extracts the bearer token, verifies it as an access
/// token, loads the active identity and injects [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let token = bearer_token(header)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = state.issuer.verify_kind(token, TokenKind::Access)?;
    let identity = load_active_identity(&state.pool, &claims.sub).await?;

    request.extensions_mut().insert(AuthenticatedUser { identity });

    Ok(next.run(request).await)
}
