use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::endpoints::client_ip;
use crate::error::{AppError, Result};
use crate::middleware::{Authenticated, RoleGuard, SupervisorOrAdmin};
use crate::models::activity_log::ActivityAction;
use crate::models::occurrence;
use crate::models::prelude::*;
use crate::services::occurrences::{
    self, NewOccurrence, OccurrenceFilter, OccurrenceUpdate,
};
use crate::services::{activity, export};
use crate::state::AppState;

/// Create occurrences routes
pub fn occurrences_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_occurrences).post(create_occurrence))
        .route("/export/csv", get(export_csv))
        .route("/export/pdf", get(export_pdf))
        .route(
            "/{id}",
            get(get_occurrence)
                .patch(update_occurrence)
                .delete(delete_occurrence),
        )
        .route("/{id}/approve", post(approve_occurrence))
        .route("/{id}/reject", post(reject_occurrence))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OccurrencePayload {
    pub zone_id: i64,
    pub type_id: i64,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM` (seconds accepted)
    pub time: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OccurrencePatch {
    pub zone_id: Option<i64>,
    pub type_id: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OccurrenceResponse {
    pub id: i64,
    pub user_id: i64,
    pub reporter: String,
    pub zone_id: i64,
    pub zone: String,
    pub type_id: i64,
    #[serde(rename = "type")]
    pub type_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date (expected YYYY-MM-DD): {}", s)))
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("invalid time (expected HH:MM): {}", s)))
}

struct Lookups {
    zones: HashMap<i64, String>,
    types: HashMap<i64, String>,
    users: HashMap<i64, String>,
}

async fn load_lookups(state: &AppState) -> Result<Lookups> {
    let zones = Zone::find()
        .all(&state.db)
        .await?
        .into_iter()
        .map(|z| (z.id, z.name))
        .collect();
    let types = OccurrenceType::find()
        .all(&state.db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();
    let users = User::find()
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    Ok(Lookups {
        zones,
        types,
        users,
    })
}

fn to_response(occ: occurrence::Model, lookups: &Lookups) -> OccurrenceResponse {
    OccurrenceResponse {
        id: occ.id,
        user_id: occ.user_id,
        reporter: lookups
            .users
            .get(&occ.user_id)
            .cloned()
            .unwrap_or_default(),
        zone_id: occ.zone_id,
        zone: lookups
            .zones
            .get(&occ.zone_id)
            .cloned()
            .unwrap_or_default(),
        type_id: occ.type_id,
        type_name: lookups
            .types
            .get(&occ.type_id)
            .cloned()
            .unwrap_or_default(),
        date: occ.date,
        time: occ.time.format("%H:%M").to_string(),
        location: occ.location,
        description: occ.description,
        status: occ.status,
        created_at: occ.created_at,
        updated_at: occ.updated_at,
    }
}

// ============================================================================
// CRUD Endpoints
// ============================================================================

/// List occurrences matching the active filters. Swimmers only see their
/// own reports.
async fn list_occurrences(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(filter): Query<OccurrenceFilter>,
) -> Result<Json<Vec<OccurrenceResponse>>> {
    let rows = occurrences::filtered_query(&actor, &filter)?
        .all(&state.db)
        .await?;

    let lookups = load_lookups(&state).await?;
    let responses = rows
        .into_iter()
        .map(|occ| to_response(occ, &lookups))
        .collect();

    Ok(Json(responses))
}

/// Report a new occurrence (starts in `pending`)
async fn create_occurrence(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    headers: HeaderMap,
    Json(payload): Json<OccurrencePayload>,
) -> Result<Response> {
    let data = NewOccurrence {
        zone_id: payload.zone_id,
        type_id: payload.type_id,
        date: parse_date(&payload.date)?,
        time: parse_time(&payload.time)?,
        location: payload.location,
        description: payload.description,
    };

    let created = occurrences::create(&state.db, &actor, data, client_ip(&headers)).await?;

    let lookups = load_lookups(&state).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(to_response(created, &lookups)),
    )
        .into_response())
}

/// Read one occurrence (owner or elevated role)
async fn get_occurrence(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<OccurrenceResponse>> {
    let occ = occurrences::get(&state.db, &actor, id).await?;
    let lookups = load_lookups(&state).await?;
    Ok(Json(to_response(occ, &lookups)))
}

/// Edit a pending occurrence (owner or elevated role)
async fn update_occurrence(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<OccurrencePatch>,
) -> Result<Json<OccurrenceResponse>> {
    let data = OccurrenceUpdate {
        zone_id: payload.zone_id,
        type_id: payload.type_id,
        date: payload.date.as_deref().map(parse_date).transpose()?,
        time: payload.time.as_deref().map(parse_time).transpose()?,
        location: payload.location,
        description: payload.description,
    };

    let updated = occurrences::update(&state.db, &actor, id, data, client_ip(&headers)).await?;
    let lookups = load_lookups(&state).await?;
    Ok(Json(to_response(updated, &lookups)))
}

/// Delete a pending occurrence (owner or elevated role)
async fn delete_occurrence(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    occurrences::delete(&state.db, &actor, id, client_ip(&headers)).await?;
    Ok(Json(serde_json::json!({"detail": "Occurrence removed"})))
}

// ============================================================================
// Workflow Endpoints
// ============================================================================

/// Approve a pending occurrence (supervisor/admin)
async fn approve_occurrence(
    State(state): State<AppState>,
    RoleGuard(actor, _): RoleGuard<SupervisorOrAdmin>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<OccurrenceResponse>> {
    let updated = occurrences::approve(&state.db, &actor, id, client_ip(&headers)).await?;
    let lookups = load_lookups(&state).await?;
    Ok(Json(to_response(updated, &lookups)))
}

/// Reject a pending occurrence (supervisor/admin)
async fn reject_occurrence(
    State(state): State<AppState>,
    RoleGuard(actor, _): RoleGuard<SupervisorOrAdmin>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<OccurrenceResponse>> {
    let updated = occurrences::reject(&state.db, &actor, id, client_ip(&headers)).await?;
    let lookups = load_lookups(&state).await?;
    Ok(Json(to_response(updated, &lookups)))
}

// ============================================================================
// Export Endpoints
// ============================================================================

/// Export the filtered list as CSV
async fn export_csv(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(filter): Query<OccurrenceFilter>,
    headers: HeaderMap,
) -> Result<Response> {
    let (bytes, count) = export::export_csv(&state.db, &actor, &filter).await?;

    activity::record(
        &state.db,
        actor.id,
        ActivityAction::ExportCsv,
        "Exported occurrences (CSV)",
        Some(serde_json::json!({"count": count})),
        client_ip(&headers),
    )
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"occurrences.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Export the filtered list as a PDF report
async fn export_pdf(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(filter): Query<OccurrenceFilter>,
    headers: HeaderMap,
) -> Result<Response> {
    let (bytes, count) =
        export::export_pdf(&state.db, &actor, &filter, &state.config.app_name).await?;

    activity::record(
        &state.db,
        actor.id,
        ActivityAction::ExportPdf,
        "Exported occurrences (PDF)",
        Some(serde_json::json!({"count": count})),
        client_ip(&headers),
    )
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"occurrences.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
