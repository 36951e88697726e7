//! Domain model for the sales record store.
//!
//! # Responsibility
//! - Define the record, insert and patch shapes for every stored entity.
//! - Validate field-level rules before any SQL runs.
//!
//! # Invariants
//! - Every record is identified by a store-assigned integer `RecordId`.
//! - Records carry foreign-key columns only; dependents are loaded through
//!   repository queries, never held as in-memory collections.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod attachment;
pub mod audit;
pub mod contact;
pub mod customer;
pub mod deal;
pub mod interaction;
pub mod tag;
pub mod user;
pub mod validation;

/// Surrogate integer identity assigned by the store on insert.
pub type RecordId = i64;

/// Entity types known to the store.
///
/// The string form is persisted as `audit_logs.entity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Customer,
    Contact,
    Deal,
    InteractionLog,
    Attachment,
    Tag,
    AuditLog,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Customer => "Customer",
            Self::Contact => "Contact",
            Self::Deal => "Deal",
            Self::InteractionLog => "InteractionLog",
            Self::Attachment => "Attachment",
            Self::Tag => "Tag",
            Self::AuditLog => "AuditLog",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every persisted record type.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> RecordId;
}

/// Serde adapter for patch fields on nullable columns.
///
/// A missing field stays `None` (leave unchanged), an explicit `null`
/// becomes `Some(None)` (clear), any value becomes `Some(Some(value))`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Applies a nullable-column patch value onto `target`.
pub(crate) fn patch_nullable<T: Clone>(target: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *target = value.clone();
    }
}

/// Applies a required-column patch value onto `target`.
pub(crate) fn patch_required<T: Clone>(target: &mut T, patch: &Option<T>) {
    if let Some(value) = patch {
        *target = value.clone();
    }
}
