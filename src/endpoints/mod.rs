pub mod activities;
pub mod auth;
pub mod dashboard;
pub mod notifications;
pub mod occurrence_types;
pub mod occurrences;
pub mod settings;
pub mod users;
pub mod zones;

use axum::http::HeaderMap;
use axum::{middleware as axum_middleware, Router};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", axum::routing::get(health_check))
        .nest("/auth", auth::auth_routes(state.clone()));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .nest("/api", api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(state, require_auth));

    // Merge public and protected routes
    public_routes.merge(protected_routes)
}

/// API routes under /api/* (protected by auth middleware)
fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/occurrences", occurrences::occurrences_routes(state.clone()))
        .nest("/users", users::users_routes(state.clone()))
        .nest("/zones", zones::zones_routes(state.clone()))
        .nest("/types", occurrence_types::types_routes(state.clone()))
        .nest("/settings", settings::settings_routes(state.clone()))
        .nest("/activities", activities::activities_routes(state.clone()))
        .nest(
            "/notifications",
            notifications::notifications_routes(state.clone()),
        )
        .nest("/dashboard", dashboard::dashboard_routes(state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Best-effort client address for the activity log.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
