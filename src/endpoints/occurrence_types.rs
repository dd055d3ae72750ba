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
use crate::models::{occurrence, occurrence_type};
use crate::services::activity;
use crate::state::AppState;

/// Create occurrence-type reference-data routes
pub fn types_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_types).post(create_type))
        .route(
            "/{type_id}",
            axum::routing::patch(update_type).delete(delete_type),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTypeRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// List occurrence types, alphabetically (any authenticated user)
async fn list_types(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> Result<Json<Vec<occurrence_type::Model>>> {
    let types = OccurrenceType::find()
        .order_by_asc(occurrence_type::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(types))
}

/// Create an occurrence type (admin)
async fn create_type(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    headers: HeaderMap,
    Json(request): Json<CreateTypeRequest>,
) -> Result<Response> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let name = request.name.trim().to_string();
    let existing = OccurrenceType::find()
        .filter(occurrence_type::Column::Name.eq(name.clone()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Occurrence type already exists".to_string(),
        ));
    }

    let txn = state.db.begin().await?;
    let new_type = occurrence_type::ActiveModel {
        name: Set(name),
        description: Set(request.description),
        created_by: Set(Some(admin.id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = new_type.insert(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::CreateType,
        format!("Created occurrence type \"{}\"", created.name),
        Some(serde_json::json!({"type_id": created.id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Rename or re-describe an occurrence type (admin)
async fn update_type(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(type_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<UpdateTypeRequest>,
) -> Result<Json<occurrence_type::Model>> {
    let found = OccurrenceType::find_by_id(type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence type not found".to_string()))?;

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        let duplicate = OccurrenceType::find()
            .filter(occurrence_type::Column::Name.eq(name))
            .filter(occurrence_type::Column::Id.ne(type_id))
            .one(&state.db)
            .await?;
        if duplicate.is_some() {
            return Err(AppError::Conflict(
                "Occurrence type already exists".to_string(),
            ));
        }
    }

    let target_id = found.id;
    let txn = state.db.begin().await?;

    let mut active: occurrence_type::ActiveModel = found.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        admin.id,
        ActivityAction::EditType,
        format!("Edited occurrence type #{}", target_id),
        Some(serde_json::json!({"type_id": target_id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(updated))
}

/// Delete an occurrence type (admin). Blocked while referenced.
async fn delete_type(
    State(state): State<AppState>,
    RoleGuard(admin, _): RoleGuard<AdminOnly>,
    Path(type_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let found = OccurrenceType::find_by_id(type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence type not found".to_string()))?;

    let in_use = Occurrence::find()
        .filter(occurrence::Column::TypeId.eq(type_id))
        .count(&state.db)
        .await?;
    if in_use > 0 {
        return Err(AppError::ReferentialConflict(format!(
            "Occurrence type \"{}\" is referenced by {} occurrence(s)",
            found.name, in_use
        )));
    }

    let name = found.name.clone();
    let txn = state.db.begin().await?;
    found.delete(&txn).await?;
    activity::record(
        &txn,
        admin.id,
        ActivityAction::DeleteType,
        format!("Deleted occurrence type \"{}\"", name),
        Some(serde_json::json!({"type_id": type_id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(serde_json::json!({"detail": "Occurrence type removed"})))
}
