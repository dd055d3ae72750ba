//! Test helpers and utilities for integration testing.
//!
//! Each test builds the real router over an in-memory SQLite database
//! migrated with the production `Migrator`, then drives it with
//! `tower::util::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tower::util::ServiceExt;

use praias::config::Config;
use praias::endpoints::create_router;
use praias::migrations::Migrator;
use praias::models::user::{self, Role};
use praias::models::{occurrence_type, zone};
use praias::services::hash_password;
use praias::state::AppState;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // Use simple in-memory SQLite - each connection gets its own database
    let db_url = "sqlite::memory:";

    let db = Database::connect(db_url)
        .await
        .expect("Failed to create test database");

    // Run migrations using the Migrator
    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Deterministic configuration for tests: fixed secret, no email provider.
pub fn test_config() -> Config {
    let mut config = Config::from_env();
    config.app_name = "Praias Fluviais".to_string();
    config.app_url = "http://localhost:8000".to_string();
    config.auth.secret_key = "integration-test-secret".to_string();
    config.auth.session_ttl = 3600;
    config.auth.reauth_max_age = 900;
    config.auth.reset_token_ttl = 3600;
    config.email.smtp_server = None;
    config.email.smtp_email = None;
    config.email.smtp_password = None;
    config.email.resend_api_key = None;
    config.email.allowed_emails = Vec::new();
    config
}

pub fn build_app_state(db: DatabaseConnection) -> AppState {
    AppState::new(db, test_config())
}

/// Create a test user with the given role and return the user model
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> user::Model {
    let hashed = hash_password(password).unwrap();
    let now = chrono::Utc::now();

    let new_user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        tax_number: Set(None),
        hashed_password: Set(hashed),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_user.insert(db).await.unwrap()
}

/// Insert one zone and one occurrence type, returning their ids
pub async fn seed_reference_row(db: &DatabaseConnection) -> (i64, i64) {
    let now = chrono::Utc::now();

    let new_zone = zone::ActiveModel {
        name: Set(format!("Test zone {}", uuid::Uuid::new_v4())),
        location: Set(Some("test river".to_string())),
        created_by: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    let seeded_zone = new_zone.insert(db).await.unwrap();

    let new_type = occurrence_type::ActiveModel {
        name: Set(format!("Test type {}", uuid::Uuid::new_v4())),
        description: Set(None),
        created_by: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    let seeded_type = new_type.insert(db).await.unwrap();

    (seeded_zone.id, seeded_type.id)
}

/// POST /auth/login with the supplied credentials.
/// Returns (status, response_body_json, optional_session_cookie).
pub async fn do_login(
    state: AppState,
    email: &str,
    password: &str,
) -> (StatusCode, serde_json::Value, Option<String>) {
    let app = create_router(state);
    let payload = serde_json::json!({"email": email, "password": password}).to_string();

    let request = Request::builder()
        .uri("/auth/login")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    // Extract the session cookie (praias_session=<token>) before consuming body
    let cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .find_map(|h| {
            let s = h.to_str().ok()?;
            if s.starts_with("praias_session=") {
                let token = s.strip_prefix("praias_session=")?.splitn(2, ';').next()?;
                if token.is_empty() {
                    None
                } else {
                    Some(format!("praias_session={}", token))
                }
            } else {
                None
            }
        });

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));

    (status, body, cookie)
}

/// Log in and return the session cookie, asserting success.
pub async fn login_cookie(state: AppState, email: &str, password: &str) -> String {
    let (status, body, cookie) = do_login(state, email, password).await;
    assert_eq!(status, StatusCode::OK, "login must succeed, body: {}", body);
    cookie.expect("login must set a session cookie")
}

/// Send a request through a fresh router, optionally with a session cookie
/// and a JSON body. Returns (status, response_body_json).
pub async fn send_request(
    state: AppState,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let app = create_router(state);

    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));

    (status, body)
}

/// Send a request and return the raw response (for export endpoints).
pub async fn send_raw_request(
    state: AppState,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
) -> axum::response::Response {
    let app = create_router(state);

    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }

    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}
