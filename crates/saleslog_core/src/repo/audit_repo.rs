//! Audit log repository.
//!
//! # Invariants
//! - Audit rows are append-only: there is no update path.
//! - `changes` is stored as JSON text and must parse back on read.
//! - `entityId` is not a foreign key; entries outlive the audited record.

use super::query::{Sort, SortKey};
use super::sql::{ensure_connection_ready, fetch_by_id, now, read_timestamp, to_millis, ListStatement};
use super::{RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::audit::{AuditLog, NewAuditLog};
use crate::model::user::UserId;
use crate::model::{EntityKind, RecordId};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, Row};

const AUDIT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    entity_type,
    entity_id,
    action,
    changes,
    timestamp,
    ip_address
FROM audit_logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSort {
    Timestamp,
}

impl SortKey for AuditSort {
    fn column(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
        }
    }
}

/// Query options for listing audit entries.
#[derive(Debug, Clone, Default)]
pub struct AuditListQuery {
    pub user_id: Option<UserId>,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<RecordId>,
    pub action: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `timestamp`.
    pub to: Option<DateTime<Utc>>,
    /// Defaults to `timestamp DESC`.
    pub sort: Option<Sort<AuditSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed audit log repository.
pub struct SqliteAuditLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditLogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "audit_logs")?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteAuditLogRepository<'_> {
    type Record = AuditLog;
    type New = NewAuditLog;
    type Query = AuditListQuery;

    fn insert(&self, new: &NewAuditLog) -> RepoResult<AuditLog> {
        new.validate()?;
        let changes = new
            .changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        in_savepoint(self.conn, || -> RepoResult<AuditLog> {
            self.conn.execute(
                "INSERT INTO audit_logs (
                    user_id,
                    entity_type,
                    entity_id,
                    action,
                    changes,
                    timestamp,
                    ip_address
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    new.user_id,
                    new.entity_type,
                    new.entity_id,
                    new.action,
                    changes,
                    to_millis(&now()),
                    new.ip_address,
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!(
                "event=audit_append module=repo id={} entity={} entity_id={} action={}",
                id, new.entity_type, new.entity_id, new.action
            );
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<AuditLog>> {
        fetch_by_id(self.conn, AUDIT_SELECT_SQL, id, parse_audit_row)
    }

    fn query(&self, query: &AuditListQuery) -> RepoResult<Vec<AuditLog>> {
        let mut statement = ListStatement::new(AUDIT_SELECT_SQL);
        statement.filter_eq("user_id", query.user_id);
        statement.filter_eq(
            "entity_type",
            query.entity_type.map(|kind| kind.as_str().to_string()),
        );
        statement.filter_eq("entity_id", query.entity_id);
        statement.filter_eq("action", query.action.clone());
        statement.filter_range("timestamp", query.from.as_ref(), query.to.as_ref());
        statement.order_by(query.sort.unwrap_or(Sort::desc(AuditSort::Timestamp)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_audit_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let changed = self
                .conn
                .execute("DELETE FROM audit_logs WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::AuditLog, id));
            }
            debug!("event=record_delete module=repo entity=AuditLog id={id}");
            Ok(())
        })
    }
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditLog> {
    let changes = row
        .get::<_, Option<String>>("changes")?
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|err| RepoError::InvalidData(format!("invalid audit changes: {err}")))
        })
        .transpose()?;

    Ok(AuditLog {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        entity_type: row.get("entity_type")?,
        entity_id: row.get("entity_id")?,
        action: row.get("action")?,
        changes,
        timestamp: read_timestamp(row, "timestamp")?,
        ip_address: row.get("ip_address")?,
    })
}
