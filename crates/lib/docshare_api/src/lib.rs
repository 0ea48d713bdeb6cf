//! # docshare_api
//!
//! HTTP API library for Docshare.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_DISPOSITION;
use axum::routing::{get, post};
use docshare_core::auth::jwt::CredentialIssuer;
use docshare_core::storage::{ObjectStore, StorageResolver};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ApiConfig, ConfigError};
use crate::handlers::{auth, files};

/// Route paths.
pub mod routes {
    pub const POST_SIGNUP: &str = "/signup";
    pub const POST_LOGIN: &str = "/login";
    pub const POST_REFRESH: &str = "/refresh";
    pub const POST_UPLOAD: &str = "/upload";
    pub const GET_DOWNLOAD_FILE_ID: &str = "/download/{file_id}";
}

/// Shared application state passed to all handlers.
///
/// Everything here is built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Session credential issuer.
    pub issuer: CredentialIssuer,
    /// Object storage indirection.
    pub storage: StorageResolver,
}

impl AppState {
    /// Assemble state from configuration and an object store backend.
    pub fn new(
        pool: PgPool,
        config: ApiConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ConfigError> {
        let issuer = config.credential_issuer()?;
        let storage = config.storage_resolver(store);
        Ok(Self {
            pool,
            config,
            issuer,
            storage,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `docshare_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    docshare_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_LOGIN, post(auth::login_handler))
        .route(routes::POST_REFRESH, post(auth::refresh_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            routes::POST_UPLOAD,
            post(files::upload_handler)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route(
            routes::GET_DOWNLOAD_FILE_ID,
            get(files::download_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use docshare_core::auth::jwt::SessionSubject;
    use docshare_core::models::auth::Role;
    use docshare_core::storage::MemoryObjectStore;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;

    /// State whose pool never connects; only valid for requests rejected
    /// before any query runs.
    fn offline_state() -> AppState {
        let config = ApiConfig::from_lookup(|name| {
            let value = match name {
                "DATABASE_URL" => "postgres://127.0.0.1:1/unused",
                "SECRET_KEY" => "router-test-key",
                "AWS_ACCESS_KEY_ID" => "AKID",
                "AWS_SECRET_ACCESS_KEY" => "SECRET",
                "AWS_REGION" => "us-east-1",
                "S3_BUCKET_NAME" => "docs",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.pg_connection_url)
            .unwrap();
        AppState::new(pool, config, Arc::new(MemoryObjectStore::new("docs"))).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router(offline_state()).oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn upload_without_token_is_unauthorized() {
        let (status, json) = send(
            Request::post(routes::POST_UPLOAD)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "unauthorized");
    }

    #[tokio::test]
    async fn download_with_garbage_token_is_unauthorized() {
        let (status, _) = send(
            Request::get("/download/1")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_cannot_be_used_as_access_token() {
        let state = offline_state();
        let pair = state
            .issuer
            .issue_pair(&SessionSubject::new("alice", Some(Role::Client)))
            .unwrap();
        let resp = router(state)
            .oneshot(
                Request::get("/download/1")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", pair.refresh_token),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_with_short_password_is_bad_request() {
        let body = serde_json::json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "123",
            "user_type": "operation",
        });
        let (status, json) = send(
            Request::post(routes::POST_SIGNUP)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn signup_with_unknown_role_is_rejected() {
        let body = serde_json::json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "secret1",
            "user_type": "admin",
        });
        let (status, _) = send(
            Request::post(routes::POST_SIGNUP)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn refresh_with_access_token_is_unauthorized() {
        let state = offline_state();
        let pair = state
            .issuer
            .issue_pair(&SessionSubject::new("alice", Some(Role::Client)))
            .unwrap();
        let body = serde_json::json!({ "refresh_token": pair.access_token });
        let resp = router(state)
            .oneshot(
                Request::post(routes::POST_REFRESH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
