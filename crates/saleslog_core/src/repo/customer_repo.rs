//! Customer repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Deleting a customer cascades to its contacts and deals.
//! - Deleting a customer is refused while any interaction log references the
//!   customer or one of its deals; nothing is removed in that case.

use super::query::{Sort, SortKey};
use super::sql::{
    count_by_id, ensure_connection_ready, fetch_by_id, now, read_timestamp,
    refuse_delete_with_dependents, to_millis, ListStatement,
};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::customer::{Customer, CustomerPatch, NewCustomer};
use crate::model::user::UserId;
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};

const CUSTOMER_SELECT_SQL: &str = "SELECT
    id,
    name,
    industry,
    contact_email,
    contact_phone,
    address,
    created_by_user_id,
    created_at,
    updated_at
FROM customers";

const CUSTOMER_DEPENDENTS_SQL: &str = "SELECT COUNT(*)
FROM interaction_logs
WHERE customer_id = ?1
   OR deal_id IN (SELECT id FROM deals WHERE customer_id = ?1);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSort {
    CreatedAt,
    UpdatedAt,
    Name,
}

impl SortKey for CustomerSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
        }
    }
}

/// Query options for listing customers.
#[derive(Debug, Clone, Default)]
pub struct CustomerListQuery {
    /// Case-insensitive substring over name and industry.
    pub search: Option<String>,
    pub created_by_user_id: Option<UserId>,
    /// Defaults to `createdAt DESC`.
    pub sort: Option<Sort<CustomerSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed customer repository.
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "customers")?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteCustomerRepository<'_> {
    type Record = Customer;
    type New = NewCustomer;
    type Query = CustomerListQuery;

    fn insert(&self, new: &NewCustomer) -> RepoResult<Customer> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<Customer> {
            let stamp = to_millis(&now());
            self.conn.execute(
                "INSERT INTO customers (
                    name,
                    industry,
                    contact_email,
                    contact_phone,
                    address,
                    created_by_user_id,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
                params![
                    new.name,
                    new.industry,
                    new.contact_email,
                    new.contact_phone,
                    new.address,
                    new.created_by_user_id,
                    stamp,
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=Customer id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Customer>> {
        fetch_by_id(self.conn, CUSTOMER_SELECT_SQL, id, parse_customer_row)
    }

    fn query(&self, query: &CustomerListQuery) -> RepoResult<Vec<Customer>> {
        let mut statement = ListStatement::new(CUSTOMER_SELECT_SQL);
        statement.filter_contains(&["name", "industry"], query.search.as_deref());
        statement.filter_eq("created_by_user_id", query.created_by_user_id);
        statement.order_by(query.sort.unwrap_or(Sort::desc(CustomerSort::CreatedAt)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_customer_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let interactions = count_by_id(self.conn, CUSTOMER_DEPENDENTS_SQL, id)?;
            refuse_delete_with_dependents(EntityKind::Customer, id, interactions)?;

            let changed = self
                .conn
                .execute("DELETE FROM customers WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::Customer, id));
            }
            debug!("event=record_delete module=repo entity=Customer id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteCustomerRepository<'_> {
    type Patch = CustomerPatch;

    fn update(&self, id: RecordId, patch: &CustomerPatch) -> RepoResult<Customer> {
        in_savepoint(self.conn, || -> RepoResult<Customer> {
            let mut customer = self.get_required(id)?;
            customer.apply(patch);
            customer.validate()?;

            self.conn.execute(
                "UPDATE customers
                 SET
                    name = ?1,
                    industry = ?2,
                    contact_email = ?3,
                    contact_phone = ?4,
                    address = ?5,
                    updated_at = ?6
                 WHERE id = ?7;",
                params![
                    customer.name,
                    customer.industry,
                    customer.contact_email,
                    customer.contact_phone,
                    customer.address,
                    to_millis(&now()),
                    id,
                ],
            )?;
            debug!("event=record_update module=repo entity=Customer id={id}");
            self.get_required(id)
        })
    }
}

fn parse_customer_row(row: &Row<'_>) -> RepoResult<Customer> {
    Ok(Customer {
        id: row.get("id")?,
        name: row.get("name")?,
        industry: row.get("industry")?,
        contact_email: row.get("contact_email")?,
        contact_phone: row.get("contact_phone")?,
        address: row.get("address")?,
        created_by_user_id: row.get("created_by_user_id")?,
        created_at: read_timestamp(row, "created_at")?,
        updated_at: read_timestamp(row, "updated_at")?,
    })
}
