//! Deal repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `value` is persisted as canonical decimal text so no precision is lost.
//! - Deleting a deal is refused while interaction logs reference it.

use super::query::{Sort, SortKey};
use super::sql::{
    count_by_id, ensure_connection_ready, fetch_by_id, now, read_optional_timestamp,
    read_timestamp, refuse_delete_with_dependents, to_millis, ListStatement,
};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::customer::CustomerId;
use crate::model::deal::{Deal, DealPatch, NewDeal};
use crate::model::user::UserId;
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

const DEAL_SELECT_SQL: &str = "SELECT
    id,
    customer_id,
    title,
    description,
    value,
    currency,
    status,
    stage,
    close_date,
    created_by_user_id,
    created_at,
    updated_at
FROM deals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealSort {
    CreatedAt,
    UpdatedAt,
    Title,
    CloseDate,
}

impl SortKey for DealSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
            Self::CloseDate => "close_date",
        }
    }
}

/// Query options for listing deals.
#[derive(Debug, Clone, Default)]
pub struct DealListQuery {
    pub customer_id: Option<CustomerId>,
    pub status: Option<String>,
    pub stage: Option<String>,
    pub created_by_user_id: Option<UserId>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    /// Defaults to `createdAt DESC`.
    pub sort: Option<Sort<DealSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed deal repository.
pub struct SqliteDealRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDealRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "deals")?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteDealRepository<'_> {
    type Record = Deal;
    type New = NewDeal;
    type Query = DealListQuery;

    fn insert(&self, new: &NewDeal) -> RepoResult<Deal> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<Deal> {
            let stamp = to_millis(&now());
            self.conn.execute(
                "INSERT INTO deals (
                    customer_id,
                    title,
                    description,
                    value,
                    currency,
                    status,
                    stage,
                    close_date,
                    created_by_user_id,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10);",
                params![
                    new.customer_id,
                    new.title,
                    new.description,
                    new.value.as_ref().map(Decimal::to_string),
                    new.currency,
                    new.status,
                    new.stage,
                    new.close_date.as_ref().map(to_millis),
                    new.created_by_user_id,
                    stamp,
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=Deal id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Deal>> {
        fetch_by_id(self.conn, DEAL_SELECT_SQL, id, parse_deal_row)
    }

    fn query(&self, query: &DealListQuery) -> RepoResult<Vec<Deal>> {
        let mut statement = ListStatement::new(DEAL_SELECT_SQL);
        statement.filter_eq("customer_id", query.customer_id);
        statement.filter_eq("status", query.status.clone());
        statement.filter_eq("stage", query.stage.clone());
        statement.filter_eq("created_by_user_id", query.created_by_user_id);
        statement.filter_contains(&["title", "description"], query.search.as_deref());
        statement.order_by(query.sort.unwrap_or(Sort::desc(DealSort::CreatedAt)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_deal_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let interactions = count_by_id(
                self.conn,
                "SELECT COUNT(*) FROM interaction_logs WHERE deal_id = ?1;",
                id,
            )?;
            refuse_delete_with_dependents(EntityKind::Deal, id, interactions)?;

            let changed = self.conn.execute("DELETE FROM deals WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::Deal, id));
            }
            debug!("event=record_delete module=repo entity=Deal id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteDealRepository<'_> {
    type Patch = DealPatch;

    fn update(&self, id: RecordId, patch: &DealPatch) -> RepoResult<Deal> {
        in_savepoint(self.conn, || -> RepoResult<Deal> {
            let mut deal = self.get_required(id)?;
            deal.apply(patch);
            deal.validate()?;

            self.conn.execute(
                "UPDATE deals
                 SET
                    title = ?1,
                    description = ?2,
                    value = ?3,
                    currency = ?4,
                    status = ?5,
                    stage = ?6,
                    close_date = ?7,
                    updated_at = ?8
                 WHERE id = ?9;",
                params![
                    deal.title,
                    deal.description,
                    deal.value.as_ref().map(Decimal::to_string),
                    deal.currency,
                    deal.status,
                    deal.stage,
                    deal.close_date.as_ref().map(to_millis),
                    to_millis(&now()),
                    id,
                ],
            )?;
            debug!("event=record_update module=repo entity=Deal id={id}");
            self.get_required(id)
        })
    }
}

pub(crate) fn parse_decimal(text: &str) -> RepoResult<Decimal> {
    Decimal::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid decimal `{text}`: {err}")))
}

fn parse_deal_row(row: &Row<'_>) -> RepoResult<Deal> {
    let value = row
        .get::<_, Option<String>>("value")?
        .map(|text| parse_decimal(&text))
        .transpose()?;

    Ok(Deal {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        value,
        currency: row.get("currency")?,
        status: row.get("status")?,
        stage: row.get("stage")?,
        close_date: read_optional_timestamp(row, "close_date")?,
        created_by_user_id: row.get("created_by_user_id")?,
        created_at: read_timestamp(row, "created_at")?,
        updated_at: read_timestamp(row, "updated_at")?,
    })
}
