//! Occurrence lifecycle.
//!
//! The status field is a three-state machine: `pending` is initial,
//! `approved` and `rejected` are terminal. Every mutation runs inside one
//! transaction together with its activity-log entry (and, for review
//! transitions, the owner notification), so either all rows commit or none.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::activity_log::ActivityAction;
use crate::models::occurrence::OccurrenceStatus;
use crate::models::prelude::*;
use crate::models::user::{self, Role};
use crate::models::{notification, occurrence};
use crate::services::authz::{authorize, Action};
use crate::services::{activity, settings};

/// Filters shared by the list endpoint and the CSV/PDF exports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceFilter {
    pub zone_id: Option<i64>,
    pub type_id: Option<i64>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewOccurrence {
    pub zone_id: i64,
    pub type_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OccurrenceUpdate {
    pub zone_id: Option<i64>,
    pub type_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Build the filtered, role-scoped occurrence query with deterministic
/// ordering (newest first, id as tie-breaker).
pub fn filtered_query(actor: &user::Model, filter: &OccurrenceFilter) -> Result<Select<Occurrence>> {
    let mut select = Occurrence::find();

    // Swimmers only ever see their own occurrences.
    if actor.role() == Role::Swimmer {
        select = select.filter(occurrence::Column::UserId.eq(actor.id));
    } else if let Some(user_id) = filter.user_id {
        select = select.filter(occurrence::Column::UserId.eq(user_id));
    }

    if let Some(zone_id) = filter.zone_id {
        select = select.filter(occurrence::Column::ZoneId.eq(zone_id));
    }
    if let Some(type_id) = filter.type_id {
        select = select.filter(occurrence::Column::TypeId.eq(type_id));
    }
    if let Some(status) = &filter.status {
        let status = OccurrenceStatus::parse(status)
            .ok_or_else(|| AppError::Validation(format!("unknown status: {}", status)))?;
        select = select.filter(occurrence::Column::Status.eq(status.as_str()));
    }
    if let Some(start) = filter.start_date {
        select = select.filter(occurrence::Column::Date.gte(start));
    }
    if let Some(end) = filter.end_date {
        select = select.filter(occurrence::Column::Date.lte(end));
    }

    Ok(select
        .order_by_desc(occurrence::Column::Date)
        .order_by_desc(occurrence::Column::Time)
        .order_by_desc(occurrence::Column::Id))
}

async fn ensure_references_exist<C: ConnectionTrait>(
    conn: &C,
    zone_id: i64,
    type_id: i64,
) -> Result<()> {
    if Zone::find_by_id(zone_id).one(conn).await?.is_none() {
        return Err(AppError::Validation(format!("unknown zone: {}", zone_id)));
    }
    if OccurrenceType::find_by_id(type_id).one(conn).await?.is_none() {
        return Err(AppError::Validation(format!(
            "unknown occurrence type: {}",
            type_id
        )));
    }
    Ok(())
}

/// Create a new occurrence in `pending` state.
pub async fn create(
    db: &DbConn,
    actor: &user::Model,
    data: NewOccurrence,
    ip_address: Option<String>,
) -> Result<occurrence::Model> {
    let txn = db.begin().await?;

    ensure_references_exist(&txn, data.zone_id, data.type_id).await?;

    // Swimmers may only report recent occurrences when the limit is set.
    let limit_hours = settings::occurrence_time_limit_hours(&txn).await?;
    if limit_hours > 0 && actor.role() == Role::Swimmer {
        let occurred_at = data.date.and_time(data.time).and_utc();
        let cutoff = Utc::now() - Duration::hours(limit_hours);
        if occurred_at < cutoff {
            return Err(AppError::Validation(format!(
                "occurrence is older than the {} hour reporting window",
                limit_hours
            )));
        }
    }

    let now = Utc::now();
    let new_occurrence = occurrence::ActiveModel {
        user_id: Set(actor.id),
        zone_id: Set(data.zone_id),
        type_id: Set(data.type_id),
        date: Set(data.date),
        time: Set(data.time),
        location: Set(data.location),
        description: Set(data.description),
        status: Set(OccurrenceStatus::Pending.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = new_occurrence.insert(&txn).await?;

    activity::record(
        &txn,
        actor.id,
        ActivityAction::CreateOccurrence,
        format!("Created occurrence #{}", created.id),
        Some(serde_json::json!({
            "occurrence_id": created.id,
            "zone_id": created.zone_id,
            "type_id": created.type_id,
        })),
        ip_address,
    )
    .await?;

    txn.commit().await?;
    Ok(created)
}

/// Fetch one occurrence, enforcing view permissions.
pub async fn get(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
) -> Result<occurrence::Model> {
    let occ = Occurrence::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence not found".to_string()))?;

    authorize(actor.role(), Action::ViewOccurrence, Some(occ.user_id), actor.id)?;
    Ok(occ)
}

fn ensure_editable(
    actor: &user::Model,
    occ: &occurrence::Model,
    action: Action,
) -> Result<()> {
    authorize(actor.role(), action, Some(occ.user_id), actor.id)?;
    if occ.status().is_terminal() {
        return Err(AppError::Forbidden(format!(
            "Occurrence #{} is {} and can no longer be modified",
            occ.id,
            occ.status
        )));
    }
    Ok(())
}

/// Edit a pending occurrence.
pub async fn update(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
    data: OccurrenceUpdate,
    ip_address: Option<String>,
) -> Result<occurrence::Model> {
    let occ = Occurrence::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence not found".to_string()))?;

    ensure_editable(actor, &occ, Action::EditOccurrence)?;

    let txn = db.begin().await?;

    ensure_references_exist(
        &txn,
        data.zone_id.unwrap_or(occ.zone_id),
        data.type_id.unwrap_or(occ.type_id),
    )
    .await?;

    // Collect old/new pairs for the audit trail before applying anything.
    let mut changes = serde_json::Map::new();
    if let Some(zone_id) = data.zone_id {
        if zone_id != occ.zone_id {
            changes.insert("zone_id".into(), serde_json::json!([occ.zone_id, zone_id]));
        }
    }
    if let Some(type_id) = data.type_id {
        if type_id != occ.type_id {
            changes.insert("type_id".into(), serde_json::json!([occ.type_id, type_id]));
        }
    }
    if let Some(date) = data.date {
        if date != occ.date {
            changes.insert("date".into(), serde_json::json!([occ.date, date]));
        }
    }
    if let Some(time) = data.time {
        if time != occ.time {
            changes.insert("time".into(), serde_json::json!([occ.time, time]));
        }
    }
    if let Some(location) = &data.location {
        if Some(location) != occ.location.as_ref() {
            changes.insert(
                "location".into(),
                serde_json::json!([occ.location, location]),
            );
        }
    }
    if let Some(description) = &data.description {
        if Some(description) != occ.description.as_ref() {
            changes.insert(
                "description".into(),
                serde_json::json!([occ.description, description]),
            );
        }
    }

    let occ_id = occ.id;
    let mut active: occurrence::ActiveModel = occ.into();
    if let Some(zone_id) = data.zone_id {
        active.zone_id = Set(zone_id);
    }
    if let Some(type_id) = data.type_id {
        active.type_id = Set(type_id);
    }
    if let Some(date) = data.date {
        active.date = Set(date);
    }
    if let Some(time) = data.time {
        active.time = Set(time);
    }
    if let Some(location) = data.location {
        active.location = Set(Some(location));
    }
    if let Some(description) = data.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    activity::record(
        &txn,
        actor.id,
        ActivityAction::EditOccurrence,
        format!("Edited occurrence #{}", occ_id),
        Some(serde_json::json!({
            "occurrence_id": occ_id,
            "changes": serde_json::Value::Object(changes),
        })),
        ip_address,
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}

/// Delete a pending occurrence.
pub async fn delete(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
    ip_address: Option<String>,
) -> Result<()> {
    let occ = Occurrence::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence not found".to_string()))?;

    ensure_editable(actor, &occ, Action::DeleteOccurrence)?;

    let details = serde_json::json!({
        "occurrence_id": occ.id,
        "zone_id": occ.zone_id,
        "type_id": occ.type_id,
    });
    let occ_id = occ.id;

    let txn = db.begin().await?;
    occ.delete(&txn).await?;
    activity::record(
        &txn,
        actor.id,
        ActivityAction::DeleteOccurrence,
        format!("Deleted occurrence #{}", occ_id),
        Some(details),
        ip_address,
    )
    .await?;
    txn.commit().await?;

    Ok(())
}

/// Approve a pending occurrence.
pub async fn approve(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
    ip_address: Option<String>,
) -> Result<occurrence::Model> {
    transition(db, actor, id, OccurrenceStatus::Approved, ip_address).await
}

/// Reject a pending occurrence.
pub async fn reject(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
    ip_address: Option<String>,
) -> Result<occurrence::Model> {
    transition(db, actor, id, OccurrenceStatus::Rejected, ip_address).await
}

async fn transition(
    db: &DbConn,
    actor: &user::Model,
    id: i64,
    target: OccurrenceStatus,
    ip_address: Option<String>,
) -> Result<occurrence::Model> {
    let occ = Occurrence::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Occurrence not found".to_string()))?;

    authorize(actor.role(), Action::ReviewOccurrence, Some(occ.user_id), actor.id)?;

    if occ.status() != OccurrenceStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "Occurrence #{} is already {}",
            occ.id, occ.status
        )));
    }

    let (action, verb) = match target {
        OccurrenceStatus::Approved => (ActivityAction::ApproveOccurrence, "approved"),
        OccurrenceStatus::Rejected => (ActivityAction::RejectOccurrence, "rejected"),
        OccurrenceStatus::Pending => {
            return Err(AppError::InvalidTransition(
                "Cannot transition back to pending".to_string(),
            ))
        }
    };

    let owner_id = occ.user_id;
    let occ_id = occ.id;
    let now = Utc::now();

    let txn = db.begin().await?;

    let mut active: occurrence::ActiveModel = occ.into();
    active.status = Set(target.as_str().to_string());
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    let note = notification::ActiveModel {
        user_id: Set(owner_id),
        title: Set(format!("Occurrence {}", verb)),
        message: Set(format!(
            "Your occurrence #{} was {} by {}.",
            occ_id, verb, actor.name
        )),
        read: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    note.insert(&txn).await?;

    activity::record(
        &txn,
        actor.id,
        action,
        format!("{} occurrence #{}", capitalize(verb), occ_id),
        Some(serde_json::json!({"occurrence_id": occ_id, "owner_id": owner_id})),
        ip_address,
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity_log;
    use crate::test_helpers::{create_test_db, create_test_user, seed_reference_row};
    use sea_orm::PaginatorTrait;

    fn sample_new(zone_id: i64, type_id: i64) -> NewOccurrence {
        NewOccurrence {
            zone_id,
            type_id,
            date: NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
            time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            location: Some("north bank".to_string()),
            description: Some("minor cut".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending_and_audits() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &swimmer, sample_new(zone_id, type_id), None)
            .await
            .unwrap();

        assert_eq!(occ.status(), OccurrenceStatus::Pending);
        assert_eq!(occ.user_id, swimmer.id);

        let log_count = ActivityLog::find()
            .filter(activity_log::Column::Action.eq("create_occurrence"))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(log_count, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_zone() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let (_, type_id) = seed_reference_row(&db).await;

        let err = create(&db, &swimmer, sample_new(9999, type_id), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_approve_creates_notification_and_log_atomically() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let supervisor =
            create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Supervisor).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &swimmer, sample_new(zone_id, type_id), None)
            .await
            .unwrap();
        let approved = approve(&db, &supervisor, occ.id, None).await.unwrap();

        assert_eq!(approved.status(), OccurrenceStatus::Approved);

        let notes = Notification::find()
            .filter(crate::models::notification::Column::UserId.eq(swimmer.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains(&format!("#{}", occ.id)));
        assert!(!notes[0].read);

        let log_count = ActivityLog::find()
            .filter(activity_log::Column::Action.eq("approve_occurrence"))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(log_count, 1);
    }

    #[tokio::test]
    async fn test_double_approve_is_invalid_transition() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let supervisor =
            create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Supervisor).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &swimmer, sample_new(zone_id, type_id), None)
            .await
            .unwrap();
        approve(&db, &supervisor, occ.id, None).await.unwrap();

        let err = approve(&db, &supervisor, occ.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let err = reject(&db, &supervisor, occ.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_swimmer_cannot_approve() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &swimmer, sample_new(zone_id, type_id), None)
            .await
            .unwrap();
        let err = approve(&db, &swimmer, occ.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_swimmer_cannot_edit_foreign_occurrence() {
        let db = create_test_db().await;
        let ana = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let rui = create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Swimmer).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &ana, sample_new(zone_id, type_id), None)
            .await
            .unwrap();

        let err = update(&db, &rui, occ.id, OccurrenceUpdate::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = delete(&db, &rui, occ.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_terminal_occurrence_cannot_be_edited_or_deleted() {
        let db = create_test_db().await;
        let ana = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let supervisor =
            create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Supervisor).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        let occ = create(&db, &ana, sample_new(zone_id, type_id), None)
            .await
            .unwrap();
        approve(&db, &supervisor, occ.id, None).await.unwrap();

        let err = update(&db, &ana, occ.id, OccurrenceUpdate::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = delete(&db, &ana, occ.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_time_limit_blocks_old_swimmer_reports() {
        let db = create_test_db().await;
        let swimmer = create_test_user(&db, "Ana", "ana@example.com", "pw", Role::Swimmer).await;
        let supervisor =
            create_test_user(&db, "Rui", "rui@example.com", "pw", Role::Supervisor).await;
        let (zone_id, type_id) = seed_reference_row(&db).await;

        settings::set_occurrence_time_limit_hours(&db, 24)
            .await
            .unwrap();

        let old = NewOccurrence {
            date: (Utc::now() - Duration::days(3)).date_naive(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ..sample_new(zone_id, type_id)
        };

        let err = create(&db, &swimmer, old, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Elevated roles are exempt from the window.
        let old = NewOccurrence {
            date: (Utc::now() - Duration::days(3)).date_naive(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ..sample_new(zone_id, type_id)
        };
        assert!(create(&db, &supervisor, old, None).await.is_ok());
    }
}
