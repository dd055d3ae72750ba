//! Auth flow integration tests
//!
//! Covers the authentication lifecycle:
//! - POST /auth/login    — valid credentials, invalid credentials, suspended account
//! - POST /auth/logout   — clears the session cookie
//! - POST /auth/register — public swimmer self-registration
//! - Re-authentication   — PATCH /api/users/me/password demands a recent credential check

use axum::http::StatusCode;
use sea_orm::{ActiveModelTrait, Set};

mod common;
use common::{build_app_state, create_test_db, create_test_user, do_login, login_cookie, send_request};

use praias::models::user::Role;
use praias::services::security::create_session_token;

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_valid_credentials_returns_200() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "correct_pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let (status, body, cookie) = do_login(state, "ana@example.com", "correct_pw").await;

    assert_eq!(
        status,
        StatusCode::OK,
        "Valid login must return 200. Body: {}",
        body
    );
    assert!(cookie.is_some(), "Login must set a session cookie");
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["role"], "swimmer");
    assert!(body["user_id"].is_number(), "response must include user_id");
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let (status, _, _) = do_login(state, "Ana@Example.COM", "pw").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_returns_401() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "correct", Role::Swimmer).await;

    let state = build_app_state(db);
    let (status, _, cookie) = do_login(state, "ana@example.com", "incorrect").await;

    assert_eq!(
        status,
        StatusCode::UNAUTHORIZED,
        "Wrong password must return 401"
    );
    assert!(cookie.is_none());
}

#[tokio::test]
async fn test_login_unknown_email_returns_401() {
    let db = create_test_db().await;

    let state = build_app_state(db);
    let (status, _, _) = do_login(state, "nobody@example.com", "anything").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_suspended_account_returns_403() {
    let db = create_test_db().await;
    let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let mut active: praias::models::user::ActiveModel = swimmer.into();
    active.is_active = Set(false);
    active.update(&db).await.unwrap();

    let state = build_app_state(db);
    let (status, body, _) = do_login(state, "ana@example.com", "pw").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().contains("suspended"));
}

// ============================================================================
// Session enforcement
// ============================================================================

#[tokio::test]
async fn test_protected_route_without_session_returns_401() {
    let db = create_test_db().await;
    let state = build_app_state(db);

    let (status, _) = send_request(state, "GET", "/api/occurrences", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_garbage_token_returns_401() {
    let db = create_test_db().await;
    let state = build_app_state(db);

    let (status, _) = send_request(
        state,
        "GET",
        "/api/occurrences",
        Some("praias_session=not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_grants_access() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    let (status, _) = send_request(state, "GET", "/api/occurrences", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "pw").await;

    let response =
        common::send_raw_request(state, "POST", "/auth/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|h| h.to_str().ok())
        .expect("logout must set a clearing cookie");
    assert!(set_cookie.contains("Max-Age=0"));
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_creates_swimmer() {
    let db = create_test_db().await;
    let state = build_app_state(db);

    let payload = serde_json::json!({
        "name": "Bruno",
        "email": "bruno@example.com",
        "password": "secret123",
    });
    let (status, body) =
        send_request(state.clone(), "POST", "/auth/register", None, Some(payload)).await;

    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["role"], "swimmer");

    // The new account can log in right away.
    let (status, _, _) = do_login(state, "bruno@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email_returns_409() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let payload = serde_json::json!({
        "name": "Another",
        "email": "ana@example.com",
        "password": "secret123",
    });
    let (status, _) = send_request(state, "POST", "/auth/register", None, Some(payload)).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let db = create_test_db().await;
    let state = build_app_state(db);

    let payload = serde_json::json!({
        "name": "Bruno",
        "email": "bruno@example.com",
        "password": "abc",
    });
    let (status, _) = send_request(state, "POST", "/auth/register", None, Some(payload)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Re-authentication for sensitive operations
// ============================================================================

#[tokio::test]
async fn test_fresh_session_can_change_password() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "old-pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "old-pw").await;

    let payload = serde_json::json!({
        "current_password": "old-pw",
        "new_password": "new-pw-123",
    });
    let (status, body) = send_request(
        state.clone(),
        "PATCH",
        "/api/users/me/password",
        Some(&cookie),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let (status, _, _) = do_login(state, "ana@example.com", "new-pw-123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stale_session_must_reauthenticate() {
    let db = create_test_db().await;
    let swimmer = create_test_user(&db, "Ana", "ana@example.com", "old-pw", Role::Swimmer).await;

    let state = build_app_state(db);

    // Token whose credential check happened well outside the window.
    let stale_auth_time =
        chrono::Utc::now() - chrono::Duration::seconds(state.config.auth.reauth_max_age + 120);
    let token = create_session_token(&swimmer, &state.config.auth, stale_auth_time).unwrap();
    let cookie = format!("praias_session={}", token);

    let payload = serde_json::json!({
        "current_password": "old-pw",
        "new_password": "new-pw-123",
    });
    let (status, body) = send_request(
        state.clone(),
        "PATCH",
        "/api/users/me/password",
        Some(&cookie),
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("Recent authentication"),
        "body: {}",
        body
    );

    // /auth/reauth issues a fresh session that satisfies the window.
    let (status, body) = send_request(
        state,
        "POST",
        "/auth/reauth",
        Some(&cookie),
        Some(serde_json::json!({"password": "old-pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "reauth must succeed, body: {}", body);
}

#[tokio::test]
async fn test_change_password_requires_correct_current_password() {
    let db = create_test_db().await;
    create_test_user(&db, "Ana", "ana@example.com", "old-pw", Role::Swimmer).await;

    let state = build_app_state(db);
    let cookie = login_cookie(state.clone(), "ana@example.com", "old-pw").await;

    let payload = serde_json::json!({
        "current_password": "wrong-pw",
        "new_password": "new-pw-123",
    });
    let (status, _) = send_request(
        state,
        "PATCH",
        "/api/users/me/password",
        Some(&cookie),
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
