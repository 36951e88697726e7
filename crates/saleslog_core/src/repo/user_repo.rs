//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `email` is unique, compared case-insensitively.
//! - Deleting a user nulls creator/uploader/actor references on customers,
//!   deals, attachments and audit logs, and is refused while interaction logs
//!   still reference the user.

use super::query::{Sort, SortKey};
use super::sql::{
    count_by_id, ensure_connection_ready, fetch_by_id, now, read_timestamp,
    refuse_delete_with_dependents, to_millis, ListStatement,
};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::user::{NewUser, User, UserId, UserPatch};
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    name,
    role,
    created_at,
    updated_at
FROM users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    CreatedAt,
    UpdatedAt,
    Name,
    Email,
}

impl SortKey for UserSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Email => "email",
        }
    }
}

/// Query options for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    /// Case-insensitive substring over name and email.
    pub search: Option<String>,
    pub role: Option<String>,
    /// Defaults to `createdAt DESC`.
    pub sort: Option<Sort<UserSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "users")?;
        Ok(Self { conn })
    }

    /// Looks up a user by email, ignoring ASCII case.
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }
}

impl RecordRepository for SqliteUserRepository<'_> {
    type Record = User;
    type New = NewUser;
    type Query = UserListQuery;

    fn insert(&self, new: &NewUser) -> RepoResult<User> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<User> {
            let stamp = to_millis(&now());
            self.conn.execute(
                "INSERT INTO users (email, name, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![new.email, new.name, new.role, stamp],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=User id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<User>> {
        fetch_by_id(self.conn, USER_SELECT_SQL, id, parse_user_row)
    }

    fn query(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut statement = ListStatement::new(USER_SELECT_SQL);
        statement.filter_contains(&["name", "email"], query.search.as_deref());
        statement.filter_eq("role", query.role.clone());
        statement.order_by(query.sort.unwrap_or(Sort::desc(UserSort::CreatedAt)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_user_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let interactions = count_by_id(
                self.conn,
                "SELECT COUNT(*) FROM interaction_logs WHERE user_id = ?1;",
                id,
            )?;
            refuse_delete_with_dependents(EntityKind::User, id, interactions)?;

            let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::User, id));
            }
            debug!("event=record_delete module=repo entity=User id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteUserRepository<'_> {
    type Patch = UserPatch;

    fn update(&self, id: RecordId, patch: &UserPatch) -> RepoResult<User> {
        in_savepoint(self.conn, || -> RepoResult<User> {
            let mut user = self.get_required(id)?;
            user.apply(patch);
            user.validate()?;

            self.conn.execute(
                "UPDATE users
                 SET
                    email = ?1,
                    name = ?2,
                    role = ?3,
                    updated_at = ?4
                 WHERE id = ?5;",
                params![user.email, user.name, user.role, to_millis(&now()), id],
            )?;
            debug!("event=record_update module=repo entity=User id={id}");
            self.get_required(id)
        })
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: UserId = row.get("id")?;
    Ok(User {
        id,
        email: row.get("email")?,
        name: row.get("name")?,
        role: row.get("role")?,
        created_at: read_timestamp(row, "created_at")?,
        updated_at: read_timestamp(row, "updated_at")?,
    })
}
