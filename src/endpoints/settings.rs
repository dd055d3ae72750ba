use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::endpoints::client_ip;
use crate::error::Result;
use crate::middleware::{AdminOnly, RoleGuard};
use crate::models::activity_log::ActivityAction;
use crate::services::{activity, settings};
use crate::state::AppState;

/// Create settings routes (admin only)
pub fn settings_routes(state: AppState) -> Router {
    Router::new()
        .route("/time-limit", get(get_time_limit).put(set_time_limit))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct TimeLimitResponse {
    /// Maximum age in hours for swimmer-reported occurrences; 0 disables
    /// the limit.
    pub time_limit_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct TimeLimitRequest {
    pub time_limit_hours: i64,
}

/// Read the occurrence reporting time limit
async fn get_time_limit(
    State(state): State<AppState>,
    RoleGuard(_, _): RoleGuard<AdminOnly>,
) -> Result<Json<TimeLimitResponse>> {
    let hours = settings::occurrence_time_limit_hours(&state.db).await?;
    Ok(Json(TimeLimitResponse {
        time_limit_hours: hours,
    }))
}

/// Update the occurrence reporting time limit
async fn set_time_limit(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    headers: HeaderMap,
    Json(request): Json<TimeLimitRequest>,
) -> Result<Json<TimeLimitResponse>> {
    let txn = state.db.begin().await?;
    settings::set_occurrence_time_limit_hours(&txn, request.time_limit_hours).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::SettingChanged,
        format!(
            "Set occurrence time limit to {} hour(s)",
            request.time_limit_hours
        ),
        Some(serde_json::json!({"time_limit_hours": request.time_limit_hours})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(TimeLimitResponse {
        time_limit_hours: request.time_limit_hours,
    }))
}
