//! SQLite storage bootstrap, schema migrations and write scopes.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the record store.
//! - Apply schema migrations in deterministic order.
//! - Provide the savepoint scope every record write runs in.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write records before migrations succeed.
//! - Foreign keys are enforced on every connection handed out by this module.

use log::warn;
use rusqlite::Connection;
use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

const WRITE_SAVEPOINT: &str = "saleslog_write";

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

/// Runs `body` inside a SQLite savepoint.
///
/// The savepoint behaves as a transaction when none is open and as a nested
/// scope inside a caller's transaction. Any `Err` from `body` rolls back every
/// statement issued since the savepoint was opened.
pub fn in_savepoint<T, E, F>(conn: &Connection, body: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT};"))?;

    match body() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {WRITE_SAVEPOINT};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute_batch(&format!(
                "ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT};"
            )) {
                warn!(
                    "event=savepoint_rollback module=db status=error error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}
