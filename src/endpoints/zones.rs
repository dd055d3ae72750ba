use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use validator::Validate;

use crate::endpoints::client_ip;
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, Authenticated, RoleGuard};
use crate::models::activity_log::ActivityAction;
use crate::models::prelude::*;
use crate::models::{occurrence, zone};
use crate::services::activity;
use crate::state::AppState;

/// Create zone reference-data routes
pub fn zones_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_zones).post(create_zone))
        .route("/{zone_id}", axum::routing::patch(update_zone).delete(delete_zone))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateZoneRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateZoneRequest {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// List zones, alphabetically (any authenticated user)
async fn list_zones(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> Result<Json<Vec<zone::Model>>> {
    let zones = Zone::find()
        .order_by_asc(zone::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(zones))
}

/// Create a zone (admin)
async fn create_zone(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    headers: HeaderMap,
    Json(request): Json<CreateZoneRequest>,
) -> Result<Response> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let name = request.name.trim().to_string();
    let existing = Zone::find()
        .filter(zone::Column::Name.eq(name.clone()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Zone already exists".to_string()));
    }

    let txn = state.db.begin().await?;
    let new_zone = zone::ActiveModel {
        name: Set(name),
        location: Set(request.location),
        created_by: Set(Some(admin.id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = new_zone.insert(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::CreateZone,
        format!("Created zone \"{}\"", created.name),
        Some(serde_json::json!({"zone_id": created.id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Rename or relocate a zone (admin)
async fn update_zone(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(zone_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<UpdateZoneRequest>,
) -> Result<Json<zone::Model>> {
    let found = Zone::find_by_id(zone_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Zone not found".to_string()))?;

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let duplicate = Zone::find()
            .filter(zone::Column::Name.eq(name))
            .filter(zone::Column::Id.ne(zone_id))
            .one(&state.db)
            .await?;
        if duplicate.is_some() {
            return Err(AppError::Conflict("Zone already exists".to_string()));
        }
    }

    let target_id = found.id;
    let txn = state.db.begin().await?;

    let mut active: zone::ActiveModel = found.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(location) = request.location {
        active.location = Set(Some(location));
    }
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::EditZone,
        format!("Edited zone #{}", target_id),
        Some(serde_json::json!({"zone_id": target_id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(updated))
}

/// Delete a zone (admin). Blocked while any occurrence references it, so
/// historical records keep their zone.
async fn delete_zone(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(zone_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let found = Zone::find_by_id(zone_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Zone not found".to_string()))?;

    let in_use = Occurrence::find()
        .filter(occurrence::Column::ZoneId.eq(zone_id))
        .count(&state.db)
        .await?;
    if in_use > 0 {
        return Err(AppError::ReferentialConflict(format!(
            "Zone \"{}\" is referenced by {} occurrence(s)",
            found.name, in_use
        )));
    }

    let name = found.name.clone();
    let txn = state.db.begin().await?;
    found.delete(&txn).await?;
    activity::record(
        &txn,
        admin.id,
        ActivityAction::DeleteZone,
        format!("Deleted zone \"{}\"", name),
        Some(serde_json::json!({"zone_id": zone_id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(serde_json::json!({"detail": "Zone removed"})))
}
