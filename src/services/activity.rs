//! Append-only activity log.
//!
//! Writes are generic over [`ConnectionTrait`] so callers can pass their
//! open transaction: the audit entry commits or rolls back together with
//! the mutation it records. Entries are never updated or deleted.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::Result;
use crate::models::activity_log::{self, ActivityAction};

/// Append one activity entry on the given connection or transaction.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    action: ActivityAction,
    description: impl Into<String>,
    details: Option<serde_json::Value>,
    ip_address: Option<String>,
) -> Result<activity_log::Model> {
    let entry = activity_log::ActiveModel {
        user_id: Set(user_id),
        action: Set(action.to_string()),
        description: Set(description.into()),
        details: Set(details.map(|d| d.to_string())),
        ip_address: Set(ip_address),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(conn).await?)
}

/// Query parameters for fetching activity entries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub action: Option<String>,
    pub user_id: Option<i64>,
}

/// Paginated activity response
#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub entries: Vec<activity_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// List activity entries for one user, newest first.
pub async fn list_for_user(db: &DbConn, user_id: i64, query: &ActivityQuery) -> Result<ActivityPage> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut select = activity_log::Entity::find().filter(activity_log::Column::UserId.eq(user_id));

    if let Some(action) = &query.action {
        select = select.filter(activity_log::Column::Action.eq(action.clone()));
    }

    let total = select.clone().count(db).await?;

    let entries = select
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .offset(offset)
        .limit(per_page)
        .all(db)
        .await?;

    let total_pages = total.div_ceil(per_page);

    Ok(ActivityPage {
        entries,
        total,
        page,
        per_page,
        total_pages,
    })
}
