//! Authentication middleware.
//!
//! Validates the session token (cookie or Bearer header), loads the user and
//! stores it in request extensions for the extractors in
//! [`crate::middleware::roles`].

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::EntityTrait;

use crate::models::prelude::*;
use crate::models::user;
use crate::services::security::decode_session_token;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "praias_session";

/// Authenticated user stored in request extensions
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user: user::Model,
    /// `auth_time` claim from the session token, for the re-auth window.
    pub auth_time: i64,
}

/// Auth middleware that validates session tokens.
///
/// Returns 401 Unauthorized if the token is missing or invalid, and 403 if
/// the account was suspended after the token was issued.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match extract_session_token(&req) {
        Some(t) => t,
        None => return unauthorized_response("Missing session token"),
    };

    let claims = match decode_session_token(&token, &state.config.auth.secret_key) {
        Ok(c) => c,
        Err(_) => return unauthorized_response("Invalid or expired session"),
    };

    let user_id: i64 = match claims.sub.parse() {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid session subject"),
    };

    let found_user = match User::find_by_id(user_id).one(&state.db).await {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("Database error during authentication: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"detail": "Database error"})),
            )
                .into_response();
        }
    };

    let found_user = match found_user {
        Some(u) => u,
        None => return unauthorized_response("User no longer exists"),
    };

    if !found_user.is_active {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"detail": "Account is suspended"})),
        )
            .into_response();
    }

    req.extensions_mut().insert(AuthenticatedUser {
        user: found_user,
        auth_time: claims.auth_time,
    });

    next.run(req).await
}

/// Extract the session token from the cookie header, falling back to a
/// Bearer Authorization header.
fn extract_session_token(req: &Request) -> Option<String> {
    if let Some(cookies) = req.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookies.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(value) = cookie.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    let auth_header = req.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

/// Create a 401 Unauthorized JSON response
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "detail": message
        })),
    )
        .into_response()
}
