//! Contact repository contracts and SQLite implementation.
//!
//! Contacts are strictly contained by their customer and go away with it.

use super::query::{Sort, SortKey};
use super::sql::{
    bool_to_int, ensure_connection_ready, fetch_by_id, now, read_bool, read_timestamp, to_millis,
    ListStatement,
};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::contact::{Contact, ContactPatch, NewContact};
use crate::model::customer::CustomerId;
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    customer_id,
    name,
    email,
    phone,
    title,
    is_primary,
    created_at,
    updated_at
FROM contacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSort {
    CreatedAt,
    UpdatedAt,
    Name,
}

impl SortKey for ContactSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
        }
    }
}

/// Query options for listing contacts.
#[derive(Debug, Clone, Default)]
pub struct ContactListQuery {
    pub customer_id: Option<CustomerId>,
    pub is_primary: Option<bool>,
    /// Case-insensitive substring over name, email and title.
    pub search: Option<String>,
    /// Defaults to `createdAt DESC`.
    pub sort: Option<Sort<ContactSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "contacts")?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteContactRepository<'_> {
    type Record = Contact;
    type New = NewContact;
    type Query = ContactListQuery;

    fn insert(&self, new: &NewContact) -> RepoResult<Contact> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<Contact> {
            let stamp = to_millis(&now());
            self.conn.execute(
                "INSERT INTO contacts (
                    customer_id,
                    name,
                    email,
                    phone,
                    title,
                    is_primary,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
                params![
                    new.customer_id,
                    new.name,
                    new.email,
                    new.phone,
                    new.title,
                    bool_to_int(new.is_primary),
                    stamp,
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=Contact id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Contact>> {
        fetch_by_id(self.conn, CONTACT_SELECT_SQL, id, parse_contact_row)
    }

    fn query(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        let mut statement = ListStatement::new(CONTACT_SELECT_SQL);
        statement.filter_eq("customer_id", query.customer_id);
        statement.filter_eq("is_primary", query.is_primary.map(bool_to_int));
        statement.filter_contains(&["name", "email", "title"], query.search.as_deref());
        statement.order_by(query.sort.unwrap_or(Sort::desc(ContactSort::CreatedAt)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_contact_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let changed = self
                .conn
                .execute("DELETE FROM contacts WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::Contact, id));
            }
            debug!("event=record_delete module=repo entity=Contact id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteContactRepository<'_> {
    type Patch = ContactPatch;

    fn update(&self, id: RecordId, patch: &ContactPatch) -> RepoResult<Contact> {
        in_savepoint(self.conn, || -> RepoResult<Contact> {
            let mut contact = self.get_required(id)?;
            contact.apply(patch);
            contact.validate()?;

            self.conn.execute(
                "UPDATE contacts
                 SET
                    name = ?1,
                    email = ?2,
                    phone = ?3,
                    title = ?4,
                    is_primary = ?5,
                    updated_at = ?6
                 WHERE id = ?7;",
                params![
                    contact.name,
                    contact.email,
                    contact.phone,
                    contact.title,
                    bool_to_int(contact.is_primary),
                    to_millis(&now()),
                    id,
                ],
            )?;
            debug!("event=record_update module=repo entity=Contact id={id}");
            self.get_required(id)
        })
    }
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    Ok(Contact {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        title: row.get("title")?,
        is_primary: read_bool(row, "is_primary")?,
        created_at: read_timestamp(row, "created_at")?,
        updated_at: read_timestamp(row, "updated_at")?,
    })
}
