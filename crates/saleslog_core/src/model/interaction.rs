//! Interaction log model.
//!
//! An interaction is always about one customer, one of that customer's deals,
//! and one acting user. None of those references may be dropped while the
//! interaction exists.

use super::customer::CustomerId;
use super::deal::DealId;
use super::user::UserId;
use super::validation::{
    millisecond_timestamp, reference, required, required_text, ValidationResult,
};
use super::{patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type InteractionLogId = RecordId;

const TYPE_MAX: usize = 50;
const SUBJECT_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLog {
    pub id: InteractionLogId,
    pub customer_id: CustomerId,
    pub deal_id: DealId,
    pub user_id: UserId,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub notes: String,
    pub interaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInteractionLog {
    pub customer_id: CustomerId,
    pub deal_id: DealId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub notes: String,
    pub interaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLogPatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub interaction_date: Option<DateTime<Utc>>,
}

impl NewInteractionLog {
    pub fn validate(&self) -> ValidationResult {
        reference("customerId", self.customer_id)?;
        reference("dealId", self.deal_id)?;
        reference("userId", self.user_id)?;
        validate_fields(&self.kind, &self.subject, &self.notes, &self.interaction_date)
    }
}

impl InteractionLog {
    pub fn apply(&mut self, patch: &InteractionLogPatch) {
        patch_required(&mut self.kind, &patch.kind);
        patch_required(&mut self.subject, &patch.subject);
        patch_required(&mut self.notes, &patch.notes);
        patch_required(&mut self.interaction_date, &patch.interaction_date);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(&self.kind, &self.subject, &self.notes, &self.interaction_date)
    }
}

impl Entity for InteractionLog {
    const KIND: EntityKind = EntityKind::InteractionLog;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn validate_fields(
    kind: &str,
    subject: &str,
    notes: &str,
    interaction_date: &DateTime<Utc>,
) -> ValidationResult {
    required_text("type", kind, TYPE_MAX)?;
    required_text("subject", subject, SUBJECT_MAX)?;
    required("notes", notes)?;
    millisecond_timestamp("interactionDate", interaction_date)
}
