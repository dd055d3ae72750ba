use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::endpoints::client_ip;
use crate::error::{AppError, Result};
use crate::middleware::Authenticated;
use crate::models::activity_log::ActivityAction;
use crate::models::notification;
use crate::models::prelude::*;
use crate::services::activity;
use crate::state::AppState;

/// Create notification-center routes
pub fn notifications_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/{id}/read", post(mark_notification_read))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<notification::Model>,
    pub unread_count: u64,
}

/// Current user's inbox, newest first
async fn list_notifications(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<NotificationsResponse>> {
    let notifications = Notification::find()
        .filter(notification::Column::UserId.eq(actor.id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(&state.db)
        .await?;

    let unread_count = Notification::find()
        .filter(notification::Column::UserId.eq(actor.id))
        .filter(notification::Column::Read.eq(false))
        .count(&state.db)
        .await?;

    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

/// Mark one of the caller's notifications as read
async fn mark_notification_read(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<notification::Model>> {
    let found = Notification::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    // The read flag belongs to the inbox owner alone.
    if found.user_id != actor.id {
        return Err(AppError::Forbidden(
            "Notification belongs to another user".to_string(),
        ));
    }

    let target_id = found.id;
    let txn = state.db.begin().await?;

    let mut active: notification::ActiveModel = found.into();
    active.read = Set(true);
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        actor.id,
        ActivityAction::MarkNotificationRead,
        format!("Marked notification #{} as read", target_id),
        Some(serde_json::json!({"notification_id": target_id})),
        client_ip(&headers),
    )
    .await?;
    txn.commit().await?;

    Ok(Json(updated))
}
