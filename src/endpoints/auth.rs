use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::endpoints::client_ip;
use crate::error::{AppError, Result};
use crate::middleware::SESSION_COOKIE_NAME;
use crate::models::activity_log::ActivityAction;
use crate::models::prelude::*;
use crate::models::user::{self, Role};
use crate::services::mailer::Delivery;
use crate::services::security::{create_session_token, decode_session_token};
use crate::services::{activity, hash_password, password_reset, verify_password};
use crate::state::AppState;

/// Create auth routes for session management and password recovery
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/reauth", post(reauth))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "name must have at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must have at least 6 characters"))]
    pub password: String,
    pub tax_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReauthRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub detail: String,
    /// Present only when email delivery did not happen (allow-list
    /// workaround); the caller shows the link directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_link: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "password must have at least 6 characters"))]
    pub password: String,
}

// ============================================================================
// Session Cookie Helpers
// ============================================================================

/// Create a session cookie with the given token
fn create_session_cookie(token: &str, max_age: i64, secure: bool) -> HeaderValue {
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE_NAME,
        token,
        max_age,
        if secure { "; Secure" } else { "" }
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Create a cookie that clears the session
fn clear_session_cookie() -> HeaderValue {
    let cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE_NAME
    );
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Extract the session token from a cookie header
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?;
    let cookie_str = cookies.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
            return Some(value.to_string());
        }
    }
    None
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// Login with email and password, returns session cookie
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response> {
    let found_user = User::find()
        .filter(user::Column::Email.eq(request.email.to_lowercase()))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&request.password, &found_user.hashed_password) {
        return Err(AppError::InvalidCredentials);
    }

    if !found_user.is_active {
        return Err(AppError::AccountInactive);
    }

    let now = Utc::now();
    let token = create_session_token(&found_user, &state.config.auth, now)?;

    activity::record(
        &state.db,
        found_user.id,
        ActivityAction::Login,
        "Signed in",
        None,
        client_ip(&headers),
    )
    .await?;

    let secure = state.config.app_url.starts_with("https://");
    let cookie = create_session_cookie(&token, state.config.auth.session_ttl, secure);

    let response = Json(LoginResponse {
        user_id: found_user.id,
        name: found_user.name,
        email: found_user.email,
        role: found_user.role,
    });

    Ok(([(header::SET_COOKIE, cookie)], response).into_response())
}

/// Logout - clears the session cookie
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    // Audit the logout when the session is still valid; an expired or
    // missing token still gets its cookie cleared.
    if let Some(token) = extract_session_token(&headers) {
        if let Ok(claims) = decode_session_token(&token, &state.config.auth.secret_key) {
            if let Ok(user_id) = claims.sub.parse::<i64>() {
                activity::record(
                    &state.db,
                    user_id,
                    ActivityAction::Logout,
                    "Signed out",
                    None,
                    client_ip(&headers),
                )
                .await?;
            }
        }
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({"detail": "Logged out"})),
    )
        .into_response())
}

/// Public self-registration; always creates a swimmer account.
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let tax_number = normalize_tax_number(request.tax_number)?;
    let email = request.email.to_lowercase();

    let existing = User::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email is already in use".to_string()));
    }

    if let Some(nif) = &tax_number {
        let existing_nif = User::find()
            .filter(user::Column::TaxNumber.eq(nif.clone()))
            .one(&state.db)
            .await?;
        if existing_nif.is_some() {
            return Err(AppError::Conflict(
                "Tax number is already in use".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let hashed = hash_password(&request.password)?;

    let txn = state.db.begin().await?;
    let new_user = user::ActiveModel {
        name: Set(request.name),
        email: Set(email),
        tax_number: Set(tax_number),
        hashed_password: Set(hashed),
        role: Set(Role::Swimmer.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_user.insert(&txn).await?;

    activity::record(
        &txn,
        created.id,
        ActivityAction::Register,
        "Registered an account",
        None,
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(LoginResponse {
            user_id: created.id,
            name: created.name,
            email: created.email,
            role: created.role,
        }),
    )
        .into_response())
}

/// Re-verify the password and reissue the session with a fresh auth time.
///
/// Sensitive operations check the token's `auth_time`; this endpoint is how
/// a client recovers from a `ReauthRequired` rejection.
async fn reauth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReauthRequest>,
) -> Result<Response> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("No session to refresh".to_string()))?;

    let claims = decode_session_token(&token, &state.config.auth.secret_key)
        .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid session".to_string()))?;

    let found_user = User::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&request.password, &found_user.hashed_password) {
        return Err(AppError::InvalidCredentials);
    }
    if !found_user.is_active {
        return Err(AppError::AccountInactive);
    }

    let now = Utc::now();
    let new_token = create_session_token(&found_user, &state.config.auth, now)?;
    let secure = state.config.app_url.starts_with("https://");

    Ok((
        [(
            header::SET_COOKIE,
            create_session_cookie(&new_token, state.config.auth.session_ttl, secure),
        )],
        Json(serde_json::json!({"detail": "Session refreshed"})),
    )
        .into_response())
}

// ============================================================================
// Password Recovery
// ============================================================================

/// Request a password-reset link.
///
/// The response never reveals whether the address is registered. When the
/// address is on the delivery allow-list the link goes out by email;
/// otherwise it is returned in the body for the client to display.
async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>> {
    let generic = "If the email is registered, recovery instructions were sent.".to_string();

    let found_user = User::find()
        .filter(user::Column::Email.eq(request.email.to_lowercase()))
        .one(&state.db)
        .await?;

    let found_user = match found_user {
        Some(u) => u,
        None => {
            return Ok(Json(ForgotPasswordResponse {
                detail: generic,
                reset_link: None,
            }))
        }
    };

    let token =
        password_reset::issue_token(&state.db, found_user.id, state.config.auth.reset_token_ttl)
            .await?;
    let reset_link = format!(
        "{}/reset-password/{}",
        state.config.app_url.trim_end_matches('/'),
        token
    );

    match state
        .mailer
        .send_password_reset(&found_user.email, &reset_link)
        .await
    {
        Delivery::Sent => Ok(Json(ForgotPasswordResponse {
            detail: generic,
            reset_link: None,
        })),
        Delivery::LinkOnly => Ok(Json(ForgotPasswordResponse {
            detail: "Email delivery is unavailable for this address; use the link below."
                .to_string(),
            reset_link: Some(reset_link),
        })),
    }
}

/// Redeem a reset token and set a new password.
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    password_reset::redeem(&state.db, &token, &request.password).await?;

    Ok(Json(
        serde_json::json!({"detail": "Password redefined successfully"}),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// Validate and normalize an optional Portuguese tax number (9 digits).
pub(crate) fn normalize_tax_number(tax_number: Option<String>) -> Result<Option<String>> {
    match tax_number {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.len() != 9 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::Validation(
                    "tax number must have exactly 9 digits".to_string(),
                ));
            }
            Ok(Some(trimmed))
        }
    }
}
