//! Dashboard aggregates over the caller's visible occurrences.

use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::db::DbConn;
use crate::error::Result;
use crate::models::prelude::*;
use crate::models::user;
use crate::services::occurrences::{filtered_query, OccurrenceFilter};
use sea_orm::EntityTrait;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    /// Occurrence counts for the last 12 months, keyed `YYYY-MM`.
    pub by_month: BTreeMap<String, u64>,
    pub by_zone: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub by_status: BTreeMap<String, u64>,
}

/// Aggregate counts for the dashboard. Swimmers see only their own rows,
/// elevated roles see everything.
pub async fn stats(db: &DbConn, actor: &user::Model) -> Result<DashboardStats> {
    let zones: BTreeMap<i64, String> = Zone::find()
        .all(db)
        .await?
        .into_iter()
        .map(|z| (z.id, z.name))
        .collect();
    let types: BTreeMap<i64, String> = OccurrenceType::find()
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    // Pre-fill the last 12 months so quiet months show up as zero.
    let mut by_month: BTreeMap<String, u64> = BTreeMap::new();
    let now = Utc::now().date_naive();
    let mut year = now.year();
    let mut month = now.month() as i32;
    for _ in 0..12 {
        by_month.insert(format!("{:04}-{:02}", year, month), 0);
        month -= 1;
        if month == 0 {
            year -= 1;
            month = 12;
        }
    }

    let mut by_zone: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();

    let occurrences = filtered_query(actor, &OccurrenceFilter::default())?
        .all(db)
        .await?;

    for occ in occurrences {
        let month_key = format!("{:04}-{:02}", occ.date.year(), occ.date.month());
        if let Some(count) = by_month.get_mut(&month_key) {
            *count += 1;
        }

        let zone_name = zones
            .get(&occ.zone_id)
            .cloned()
            .unwrap_or_else(|| format!("zone #{}", occ.zone_id));
        *by_zone.entry(zone_name).or_insert(0) += 1;

        let type_name = types
            .get(&occ.type_id)
            .cloned()
            .unwrap_or_else(|| format!("type #{}", occ.type_id));
        *by_type.entry(type_name).or_insert(0) += 1;

        *by_status.entry(occ.status.clone()).or_insert(0) += 1;
    }

    Ok(DashboardStats {
        by_month,
        by_zone,
        by_type,
        by_status,
    })
}
