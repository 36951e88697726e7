//! Dashboard aggregate reads.

use crate::model::deal::DEAL_STATUS_ACTIVE;
use crate::repo::deal_repo::parse_decimal;
use crate::repo::sql::to_millis;
use crate::repo::RepoResult;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Window counted as "recent" for interaction activity.
pub const RECENT_INTERACTION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: i64,
    pub total_deals: i64,
    pub total_interactions: i64,
    /// Interactions dated within the last seven days before `now`.
    pub recent_interactions: i64,
    /// Open pipeline per currency, ordered by currency code.
    pub pipeline: Vec<PipelineTotal>,
}

/// Sum of active deal values in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTotal {
    pub currency: String,
    pub active_deals: i64,
    /// Deals without a value count toward `active_deals` but add nothing here.
    pub total_value: Decimal,
}

/// Computes the dashboard counters relative to `now`.
pub fn dashboard_stats(conn: &Connection, now: DateTime<Utc>) -> RepoResult<DashboardStats> {
    let since = now - Duration::days(RECENT_INTERACTION_DAYS);

    let total_customers = count(conn, "SELECT COUNT(*) FROM customers;")?;
    let total_deals = count(conn, "SELECT COUNT(*) FROM deals;")?;
    let total_interactions = count(conn, "SELECT COUNT(*) FROM interaction_logs;")?;
    let recent_interactions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM interaction_logs WHERE interaction_date >= ?1;",
        [to_millis(&since)],
        |row| row.get(0),
    )?;
    let pipeline = active_pipeline(conn)?;

    debug!(
        "event=dashboard_stats module=service customers={} deals={} interactions={} recent={}",
        total_customers, total_deals, total_interactions, recent_interactions
    );

    Ok(DashboardStats {
        total_customers,
        total_deals,
        total_interactions,
        recent_interactions,
        pipeline,
    })
}

fn count(conn: &Connection, sql: &str) -> RepoResult<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

// Values are decimal text, so the sum happens here rather than in SQL.
fn active_pipeline(conn: &Connection) -> RepoResult<Vec<PipelineTotal>> {
    let mut stmt = conn.prepare("SELECT currency, value FROM deals WHERE status = ?1;")?;
    let mut rows = stmt.query([DEAL_STATUS_ACTIVE])?;

    let mut totals: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let currency: String = row.get(0)?;
        let value = row
            .get::<_, Option<String>>(1)?
            .map(|text| parse_decimal(&text))
            .transpose()?;

        let entry = totals.entry(currency).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        if let Some(value) = value {
            entry.1 += value;
        }
    }

    Ok(totals
        .into_iter()
        .map(|(currency, (active_deals, total_value))| PipelineTotal {
            currency,
            active_deals,
            total_value,
        })
        .collect())
}
