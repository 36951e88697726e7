//! Audit log model.
//!
//! Audit entries are append-only: they can be inserted, read and deleted but
//! never edited.

use super::user::UserId;
use super::validation::{
    optional_reference, optional_text, reference, required_text, ValidationResult,
};
use super::{Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type AuditLogId = RecordId;

const ENTITY_TYPE_MAX: usize = 50;
const ACTION_MAX: usize = 50;
const IP_ADDRESS_MAX: usize = 50;

/// Actions recorded by the audited write path.
///
/// `AuditLog.action` itself is an open string column; these are the values
/// the store writes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: AuditLogId,
    /// Nulled when the acting user is deleted.
    pub user_id: Option<UserId>,
    pub entity_type: String,
    pub entity_id: RecordId,
    pub action: String,
    pub changes: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditLog {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub entity_type: String,
    pub entity_id: RecordId,
    pub action: String,
    #[serde(default)]
    pub changes: Option<serde_json::Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl NewAuditLog {
    pub fn new(entity: EntityKind, entity_id: RecordId, action: AuditAction) -> Self {
        Self {
            user_id: None,
            entity_type: entity.as_str().to_string(),
            entity_id,
            action: action.as_str().to_string(),
            changes: None,
            ip_address: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        optional_reference("userId", self.user_id)?;
        required_text("entityType", &self.entity_type, ENTITY_TYPE_MAX)?;
        reference("entityId", self.entity_id)?;
        required_text("action", &self.action, ACTION_MAX)?;
        optional_text("ipAddress", self.ip_address.as_deref(), IP_ADDRESS_MAX)
    }
}

impl Entity for AuditLog {
    const KIND: EntityKind = EntityKind::AuditLog;

    fn id(&self) -> RecordId {
        self.id
    }
}
