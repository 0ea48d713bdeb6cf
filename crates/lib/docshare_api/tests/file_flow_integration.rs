//! Integration test — run migrations against `TEST_DATABASE_URL`, build the
//! router over an in-memory object store, and walk signup → login → upload →
//! download.
//!
//! Ignored by default; run with
//! `TEST_DATABASE_URL=postgres://... cargo test -p docshare_api -- --ignored`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use docshare_api::{AppState, config::ApiConfig};
use docshare_core::auth::queries::find_identity_by_username;
use docshare_core::files::queries::find_file_by_id;
use docshare_core::files::reconcile::{ReconcileReport, reconcile_orphans};
use docshare_core::models::auth::{Identity, Role};
use docshare_core::storage::MemoryObjectStore;
use sqlx::PgPool;
use tower::ServiceExt;

const BOUNDARY: &str = "docshare-test-boundary";

struct Harness {
    app: Router,
    pool: PgPool,
    store: Arc<MemoryObjectStore>,
    state: AppState,
}

const NEEDS_DB: &str = "requires TEST_DATABASE_URL";

async fn harness() -> Harness {
    let url = std::env::var("TEST_DATABASE_URL").expect(NEEDS_DB);

    let pool = PgPool::connect(&url).await.expect("connect to test PG");
    docshare_api::migrate(&pool).await.expect("migrations");

    let config = ApiConfig::from_lookup(|name| {
        let value = match name {
            "DATABASE_URL" => url.as_str(),
            "SECRET_KEY" => "integration-secret",
            "AWS_ACCESS_KEY_ID" => "AKID",
            "AWS_SECRET_ACCESS_KEY" => "SECRET",
            "AWS_REGION" => "us-east-1",
            "S3_BUCKET_NAME" => "docs",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("config");

    let store = Arc::new(MemoryObjectStore::new("docs"));
    let state = AppState::new(pool.clone(), config, store.clone()).expect("state");
    Harness {
        app: docshare_api::router(state.clone()),
        pool,
        store,
        state,
    }
}

async fn login_count(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM login_history WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn files_owned_by(pool: &PgPool, owner_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(request).await.expect("request");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn signup_request(username: &str, email: &str, password: &str, role: &str) -> Request<Body> {
    let body = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
        "user_type": role,
    });
    Request::post("/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::USER_AGENT, "integration-test")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

fn upload_request(token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn download_request(token: &str, file_id: i64) -> Request<Body> {
    Request::get(format!("/download/{file_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Sign up and log in, returning the login access token.
async fn login_as(h: &Harness, role: &str) -> (String, String) {
    let username = unique(role);
    let email = format!("{username}@example.com");
    let (status, _) = call(&h.app, signup_request(&username, &email, "secret1", role)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = call(&h.app, login_request(&username, "secret1")).await;
    assert_eq!(status, StatusCode::OK);
    (username, json["access_token"].as_str().unwrap().to_string())
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn signup_login_upload_download_scenario() {
    let h = harness().await;

    let alice = unique("alice");
    let email = format!("{alice}@x.com");

    // Signup issues a token pair for the submitted username.
    let (status, json) = call(&h.app, signup_request(&alice, &email, "secret1", "operation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_type"], "bearer");
    let access = json["access_token"].as_str().unwrap();
    assert!(!access.is_empty());
    assert_eq!(h.state.issuer.verify_token(access).unwrap().sub, alice);

    // Reusing the username is rejected without touching the stored identity.
    let (status, _) = call(
        &h.app,
        signup_request(&alice, "other@x.com", "different", "client"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = find_identity_by_username(&h.pool, &alice)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.identity.email, email);
    assert_ne!(stored.password_hash, "secret1");

    // Login appends exactly one event and carries the stored role.
    let (status, json) = call(&h.app, login_request(&alice, "secret1")).await;
    assert_eq!(status, StatusCode::OK);
    let op_token = json["access_token"].as_str().unwrap().to_string();
    let claims = h.state.issuer.verify_token(&op_token).unwrap();
    assert_eq!(claims.user_type.map(|r| r.as_str()), Some("operation"));
    assert_eq!(login_count(&h.pool, stored.identity.id).await, 1);

    // Upload registers a record owned by the caller and stores the object.
    let (status, json) = call(&h.app, upload_request(&op_token, "report.xlsx", b"PK\x03\x04")).await;
    assert_eq!(status, StatusCode::OK);
    let file_id = json["file_id"].as_i64().unwrap();
    assert!(file_id > 0);
    let record = find_file_by_id(&h.pool, file_id).await.unwrap().unwrap();
    assert_eq!(record.owner_id, stored.identity.id);
    assert_eq!(record.file_size, 4);
    assert_eq!(json["file_path"], record.file_path);
    let key = h.state.storage.resolve_key(&record.file_path);
    assert_eq!(h.store.get(key).unwrap(), b"PK\x03\x04");

    // Operation users may not download, even their own file.
    let (status, _) = call(&h.app, download_request(&op_token, file_id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Client users get a link; unknown ids are 404.
    let (_, client_token) = login_as(&h, "client").await;
    let (status, json) = call(&h.app, download_request(&client_token, file_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file_name"], "report.xlsx");
    assert!(json["download_url"].as_str().unwrap().contains(key));

    let (status, _) = call(&h.app, download_request(&client_token, 9_999_999)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn wrong_password_records_nothing() {
    let h = harness().await;
    let username = unique("bob");
    let email = format!("{username}@x.com");
    let (status, _) = call(&h.app, signup_request(&username, &email, "secret1", "client")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(&h.app, login_request(&username, "wrong-pass")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json.get("access_token").is_none());

    let id = find_identity_by_username(&h.pool, &username)
        .await
        .unwrap()
        .unwrap()
        .identity
        .id;
    assert_eq!(login_count(&h.pool, id).await, 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn client_upload_is_forbidden_and_stores_nothing() {
    let h = harness().await;
    let (username, token) = login_as(&h, "client").await;
    let before = h.store.len();

    let (status, _) = call(&h.app, upload_request(&token, "report.xlsx", b"data")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.store.len(), before);

    let id = find_identity_by_username(&h.pool, &username)
        .await
        .unwrap()
        .unwrap()
        .identity
        .id;
    assert_eq!(files_owned_by(&h.pool, id).await, 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn disallowed_extension_is_rejected_before_store() {
    let h = harness().await;
    let (_, token) = login_as(&h, "operation").await;
    let before = h.store.len();

    let (status, json) = call(&h.app, upload_request(&token, "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("pptx"));
    assert_eq!(h.store.len(), before);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn store_failure_is_internal_error_without_record() {
    let h = harness().await;
    let (username, token) = login_as(&h, "operation").await;
    h.store.set_fail_writes(true);

    let (status, json) = call(&h.app, upload_request(&token, "deck.pptx", b"data")).await;
    h.store.set_fail_writes(false);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Error uploading file");

    let id = find_identity_by_username(&h.pool, &username)
        .await
        .unwrap()
        .unwrap()
        .identity
        .id;
    assert_eq!(files_owned_by(&h.pool, id).await, 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn refresh_issues_role_bearing_pair() {
    let h = harness().await;
    let username = unique("carol");
    let email = format!("{username}@x.com");
    let (_, json) = call(&h.app, signup_request(&username, &email, "secret1", "client")).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "refresh_token": refresh_token });
    let (status, json) = call(
        &h.app,
        Request::post("/refresh")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let claims = h
        .state
        .issuer
        .verify_token(json["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, username);
    assert_eq!(claims.user_type.map(|r| r.as_str()), Some("client"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn failed_registration_discards_stored_object() {
    let h = harness().await;
    // No identity has this id, so the owner foreign key rejects the insert.
    let ghost = Identity {
        id: i64::MAX,
        username: unique("ghost"),
        email: "ghost@x.com".into(),
        role: Role::Operation,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let before = h.store.len();

    let result = docshare_api::services::files::upload(
        &h.pool,
        &h.state.storage,
        &ghost,
        "report.xlsx",
        b"data".to_vec(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(h.store.len(), before);
    assert_eq!(files_owned_by(&h.pool, ghost.id).await, 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn reconciliation_removes_only_unregistered_objects() {
    let h = harness().await;
    let (_, token) = login_as(&h, "operation").await;
    let (status, json) = call(&h.app, upload_request(&token, "kept.docx", b"kept")).await;
    assert_eq!(status, StatusCode::OK);
    let kept_key = h
        .state
        .storage
        .resolve_key(json["file_path"].as_str().unwrap())
        .to_string();

    // Age every object so only registration decides what survives.
    let old = Utc::now() - chrono::Duration::hours(2);
    let kept_content = h.store.get(&kept_key).unwrap();
    h.store.insert_at(&kept_key, kept_content, old);
    let orphan_key = format!("{}{}.xlsx", h.state.storage.prefix(), unique("orphan"));
    h.store.insert_at(&orphan_key, b"orphan".to_vec(), old);

    let report = reconcile_orphans(&h.pool, &h.state.storage, chrono::Duration::hours(1))
        .await
        .unwrap();

    assert!(h.store.get(&orphan_key).is_none());
    assert!(h.store.get(&kept_key).is_some());
    assert_eq!(
        report,
        ReconcileReport {
            scanned: 2,
            orphaned: 1,
            deleted: 1,
        }
    );
}
