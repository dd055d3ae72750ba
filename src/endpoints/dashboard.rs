use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::middleware::Authenticated;
use crate::services::dashboard::{self, DashboardStats};
use crate::state::AppState;

/// Create dashboard routes
pub fn dashboard_routes(state: AppState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// Aggregated occurrence counts for the caller's visible rows
async fn get_stats(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<DashboardStats>> {
    let stats = dashboard::stats(&state.db, &actor).await?;
    Ok(Json(stats))
}
