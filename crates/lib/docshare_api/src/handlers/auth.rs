//! Authentication request handlers.

use axum::extract::State;
use axum::{Form, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::client_info::ClientInfo;
use crate::models::{LoginForm, RefreshRequest, SignupRequest, TokenResponse};
use crate::services::auth;

/// `POST /signup` — create a new identity.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::signup(&state.pool, &state.issuer, &body).await?;
    Ok(Json(resp))
}

/// `POST /login` — authenticate with form-encoded username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ClientInfo(ctx): ClientInfo,
    Form(body): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        &state.pool,
        &state.issuer,
        &body.username,
        &body.password,
        &ctx,
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state.pool, &state.issuer, &body.refresh_token).await?;
    Ok(Json(resp))
}
