//! Tag model. Tag names are unique and compared case-sensitively.

use super::validation::{required_text, ValidationResult};
use super::{patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TagId = RecordId;

const NAME_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPatch {
    pub name: Option<String>,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> ValidationResult {
        required_text("name", &self.name, NAME_MAX)
    }
}

impl Tag {
    pub fn apply(&mut self, patch: &TagPatch) {
        patch_required(&mut self.name, &patch.name);
    }

    pub fn validate(&self) -> ValidationResult {
        required_text("name", &self.name, NAME_MAX)
    }
}

impl Entity for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    fn id(&self) -> RecordId {
        self.id
    }
}
