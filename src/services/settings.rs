//! Persisted system settings.

use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::system_setting;

pub const OCCURRENCE_TIME_LIMIT_KEY: &str = "occurrence_time_limit_hours";

/// Maximum age in hours for swimmer-reported occurrences. Zero disables
/// the limit.
pub async fn occurrence_time_limit_hours<C: ConnectionTrait>(conn: &C) -> Result<i64> {
    let setting = SystemSetting::find_by_id(OCCURRENCE_TIME_LIMIT_KEY)
        .one(conn)
        .await?;

    Ok(setting
        .and_then(|s| s.value.parse::<i64>().ok())
        .unwrap_or(0))
}

pub async fn set_occurrence_time_limit_hours<C: ConnectionTrait>(
    conn: &C,
    hours: i64,
) -> Result<()> {
    if hours < 0 {
        return Err(AppError::Validation(
            "time limit must be zero or positive".to_string(),
        ));
    }

    let now = chrono::Utc::now();
    let existing = SystemSetting::find_by_id(OCCURRENCE_TIME_LIMIT_KEY)
        .one(conn)
        .await?;

    match existing {
        Some(setting) => {
            let mut active: system_setting::ActiveModel = setting.into();
            active.value = Set(hours.to_string());
            active.updated_at = Set(now);
            active.update(conn).await?;
        }
        None => {
            let setting = system_setting::ActiveModel {
                key: Set(OCCURRENCE_TIME_LIMIT_KEY.to_string()),
                value: Set(hours.to_string()),
                description: Set(None),
                updated_at: Set(now),
            };
            setting.insert(conn).await?;
        }
    }

    Ok(())
}
