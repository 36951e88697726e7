//! Repository layer: the relational record store.
//!
//! # Responsibility
//! - Define the record-level contract (`insert`/`get`/`query`/`update`/`delete`)
//!   shared by every entity.
//! - Isolate SQLite query details from service orchestration.
//! - Translate engine constraint failures into semantic errors.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Every write runs inside a savepoint, so a partial cascade is never
//!   observable.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories only accept connections with foreign keys enabled and the
//!   latest schema applied.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::model::{Entity, EntityKind, RecordId};
use rusqlite::ffi;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub mod attachment_repo;
pub mod audit_repo;
pub mod contact_repo;
pub mod customer_repo;
pub mod deal_repo;
pub mod interaction_repo;
pub mod interaction_tag_repo;
pub mod query;
pub(crate) mod sql;
pub mod tag_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by record store operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: RecordId },
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("repository requires `PRAGMA foreign_keys = ON`")]
    ForeignKeysDisabled,
    #[error("failed to serialize audit snapshot: {0}")]
    AuditSnapshot(#[from] serde_json::Error),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: EntityKind, id: RecordId) -> Self {
        Self::NotFound { entity, id }
    }

    /// Returns the constraint kind when this is a constraint violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::ConstraintViolation(violation) => Some(violation.kind),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match ConstraintViolation::from_sqlite(&value) {
            Some(violation) => Self::ConstraintViolation(violation),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Category of a broken storage rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    /// Uniqueness index (for example `users.email`, `tags.name`).
    Unique,
    /// Reference to a missing parent row.
    ForeignKey,
    /// Delete refused because NO-ACTION dependents still reference the row.
    Dependents,
    NotNull,
    Check,
    Other,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign_key",
            Self::Dependents => "dependents",
            Self::NotNull => "not_null",
            Self::Check => "check",
            Self::Other => "other",
        }
    }
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A uniqueness or referential rule the write would have broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} constraint violated: {message}")]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classifies a SQLite constraint failure; `None` for any other error.
    pub fn from_sqlite(err: &rusqlite::Error) -> Option<Self> {
        let rusqlite::Error::SqliteFailure(failure, message) = err else {
            return None;
        };
        if failure.code != rusqlite::ErrorCode::ConstraintViolation {
            return None;
        }

        let kind = match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                ConstraintKind::Unique
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
            ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
            ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
            _ => ConstraintKind::Other,
        };
        let message = message
            .clone()
            .unwrap_or_else(|| failure.to_string());

        Some(Self { kind, message })
    }
}

/// Record-level contract shared by every entity repository.
pub trait RecordRepository {
    type Record: Entity;
    type New;
    type Query;

    /// Assigns identity and creation timestamp, returns the stored record.
    fn insert(&self, new: &Self::New) -> RepoResult<Self::Record>;
    fn get(&self, id: RecordId) -> RepoResult<Option<Self::Record>>;
    fn query(&self, query: &Self::Query) -> RepoResult<Vec<Self::Record>>;
    /// Applies the entity's delete behavior (cascade, set-null or refuse).
    fn delete(&self, id: RecordId) -> RepoResult<()>;

    fn get_required(&self, id: RecordId) -> RepoResult<Self::Record> {
        self.get(id)?
            .ok_or_else(|| RepoError::not_found(<Self::Record as Entity>::KIND, id))
    }
}

/// Implemented by entities whose rows can be edited after insert.
pub trait MutableRecordRepository: RecordRepository {
    type Patch;

    /// Applies `patch`, re-validates and refreshes the update timestamp.
    fn update(&self, id: RecordId, patch: &Self::Patch) -> RepoResult<Self::Record>;
}
