//! Interaction log repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist interaction logs and enforce that the referenced deal belongs to
//!   the referenced customer.
//! - Provide the filtered timeline reads used by search and export.
//!
//! # Invariants
//! - Customer, deal and user references are immutable after insert.
//! - Deleting an interaction log cascades to its attachments and tag links.

use super::query::{Sort, SortKey};
use super::sql::{
    ensure_connection_ready, fetch_by_id, now, read_timestamp, to_millis, ListStatement,
};
use super::{
    ConstraintKind, ConstraintViolation, MutableRecordRepository, RecordRepository, RepoError,
    RepoResult,
};
use crate::db::in_savepoint;
use crate::model::customer::CustomerId;
use crate::model::deal::DealId;
use crate::model::interaction::{InteractionLog, InteractionLogPatch, NewInteractionLog};
use crate::model::tag::TagId;
use crate::model::user::UserId;
use crate::model::{EntityKind, RecordId};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

const INTERACTION_SELECT_SQL: &str = "SELECT
    id,
    customer_id,
    deal_id,
    user_id,
    type,
    subject,
    notes,
    interaction_date,
    created_at,
    updated_at
FROM interaction_logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionSort {
    InteractionDate,
    CreatedAt,
    UpdatedAt,
    Subject,
}

impl SortKey for InteractionSort {
    fn column(self) -> &'static str {
        match self {
            Self::InteractionDate => "interaction_date",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Subject => "subject",
        }
    }
}

/// Query options for listing interaction logs.
#[derive(Debug, Clone, Default)]
pub struct InteractionListQuery {
    pub customer_id: Option<CustomerId>,
    pub deal_id: Option<DealId>,
    pub user_id: Option<UserId>,
    /// Exact match on the interaction type.
    pub kind: Option<String>,
    /// Only logs linked to this tag.
    pub tag_id: Option<TagId>,
    /// Inclusive lower bound on `interactionDate`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `interactionDate`.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring over subject and notes.
    pub search: Option<String>,
    /// Defaults to `interactionDate DESC`.
    pub sort: Option<Sort<InteractionSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed interaction log repository.
pub struct SqliteInteractionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInteractionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "interaction_logs")?;
        Ok(Self { conn })
    }

    fn ensure_deal_belongs_to_customer(
        &self,
        deal_id: DealId,
        customer_id: CustomerId,
    ) -> RepoResult<()> {
        let owner: Option<CustomerId> = self
            .conn
            .query_row(
                "SELECT customer_id FROM deals WHERE id = ?1;",
                [deal_id],
                |row| row.get(0),
            )
            .optional()?;

        match owner {
            Some(owner) if owner == customer_id => Ok(()),
            Some(owner) => {
                warn!(
                    "event=interaction_reference_mismatch module=repo deal_id={} customer_id={} owner_id={}",
                    deal_id, customer_id, owner
                );
                Err(ConstraintViolation::new(
                    ConstraintKind::ForeignKey,
                    format!("deal {deal_id} belongs to customer {owner}, not {customer_id}"),
                )
                .into())
            }
            None => Err(ConstraintViolation::new(
                ConstraintKind::ForeignKey,
                format!("deal {deal_id} does not exist"),
            )
            .into()),
        }
    }
}

impl RecordRepository for SqliteInteractionRepository<'_> {
    type Record = InteractionLog;
    type New = NewInteractionLog;
    type Query = InteractionListQuery;

    fn insert(&self, new: &NewInteractionLog) -> RepoResult<InteractionLog> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<InteractionLog> {
            self.ensure_deal_belongs_to_customer(new.deal_id, new.customer_id)?;

            let stamp = to_millis(&now());
            self.conn.execute(
                "INSERT INTO interaction_logs (
                    customer_id,
                    deal_id,
                    user_id,
                    type,
                    subject,
                    notes,
                    interaction_date,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8);",
                params![
                    new.customer_id,
                    new.deal_id,
                    new.user_id,
                    new.kind,
                    new.subject,
                    new.notes,
                    to_millis(&new.interaction_date),
                    stamp,
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=InteractionLog id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<InteractionLog>> {
        fetch_by_id(self.conn, INTERACTION_SELECT_SQL, id, parse_interaction_row)
    }

    fn query(&self, query: &InteractionListQuery) -> RepoResult<Vec<InteractionLog>> {
        let mut statement = ListStatement::new(INTERACTION_SELECT_SQL);
        statement.filter_eq("customer_id", query.customer_id);
        statement.filter_eq("deal_id", query.deal_id);
        statement.filter_eq("user_id", query.user_id);
        statement.filter_eq("type", query.kind.clone());
        statement.filter_clause(
            "EXISTS (
                SELECT 1
                FROM interaction_log_tags links
                WHERE links.interaction_log_id = interaction_logs.id
                  AND links.tag_id = ?
            )",
            query.tag_id,
        );
        statement.filter_range(
            "interaction_date",
            query.from.as_ref(),
            query.to.as_ref(),
        );
        statement.filter_contains(&["subject", "notes"], query.search.as_deref());
        statement.order_by(
            query
                .sort
                .unwrap_or(Sort::desc(InteractionSort::InteractionDate)),
        );
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_interaction_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let changed = self
                .conn
                .execute("DELETE FROM interaction_logs WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::InteractionLog, id));
            }
            debug!("event=record_delete module=repo entity=InteractionLog id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteInteractionRepository<'_> {
    type Patch = InteractionLogPatch;

    fn update(&self, id: RecordId, patch: &InteractionLogPatch) -> RepoResult<InteractionLog> {
        in_savepoint(self.conn, || -> RepoResult<InteractionLog> {
            let mut log = self.get_required(id)?;
            log.apply(patch);
            log.validate()?;

            self.conn.execute(
                "UPDATE interaction_logs
                 SET
                    type = ?1,
                    subject = ?2,
                    notes = ?3,
                    interaction_date = ?4,
                    updated_at = ?5
                 WHERE id = ?6;",
                params![
                    log.kind,
                    log.subject,
                    log.notes,
                    to_millis(&log.interaction_date),
                    to_millis(&now()),
                    id,
                ],
            )?;
            debug!("event=record_update module=repo entity=InteractionLog id={id}");
            self.get_required(id)
        })
    }
}

fn parse_interaction_row(row: &Row<'_>) -> RepoResult<InteractionLog> {
    Ok(InteractionLog {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        deal_id: row.get("deal_id")?,
        user_id: row.get("user_id")?,
        kind: row.get("type")?,
        subject: row.get("subject")?,
        notes: row.get("notes")?,
        interaction_date: read_timestamp(row, "interaction_date")?,
        created_at: read_timestamp(row, "created_at")?,
        updated_at: read_timestamp(row, "updated_at")?,
    })
}
