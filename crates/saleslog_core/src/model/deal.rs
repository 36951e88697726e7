//! Deal model.
//!
//! # Invariants
//! - `value` fits `decimal(18,2)`.
//! - `currency` defaults to `USD` and `status` defaults to `Active`.

use super::customer::CustomerId;
use super::user::UserId;
use super::validation::{
    decimal_18_2, optional_millisecond_timestamp, optional_reference, optional_text, reference,
    required_text, ValidationResult,
};
use super::{double_option, patch_nullable, patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type DealId = RecordId;

pub const DEFAULT_CURRENCY: &str = "USD";
/// Status of a deal still in the pipeline.
pub const DEAL_STATUS_ACTIVE: &str = "Active";

const TITLE_MAX: usize = 255;
const CURRENCY_MAX: usize = 10;
const STATUS_MAX: usize = 50;
const STAGE_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub customer_id: CustomerId,
    pub title: String,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub currency: String,
    pub status: String,
    pub stage: Option<String>,
    pub close_date: Option<DateTime<Utc>>,
    /// Nulled when the creating user is deleted.
    pub created_by_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub customer_id: CustomerId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub value: Option<Option<Decimal>>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub stage: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub close_date: Option<Option<DateTime<Utc>>>,
}

impl NewDeal {
    pub fn new(customer_id: CustomerId, title: impl Into<String>) -> Self {
        Self {
            customer_id,
            title: title.into(),
            description: None,
            value: None,
            currency: default_currency(),
            status: default_status(),
            stage: None,
            close_date: None,
            created_by_user_id: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        reference("customerId", self.customer_id)?;
        optional_reference("createdByUserId", self.created_by_user_id)?;
        validate_fields(
            &self.title,
            self.value.as_ref(),
            &self.currency,
            &self.status,
            self.stage.as_deref(),
            self.close_date.as_ref(),
        )
    }
}

impl Deal {
    pub fn apply(&mut self, patch: &DealPatch) {
        patch_required(&mut self.title, &patch.title);
        patch_nullable(&mut self.description, &patch.description);
        patch_nullable(&mut self.value, &patch.value);
        patch_required(&mut self.currency, &patch.currency);
        patch_required(&mut self.status, &patch.status);
        patch_nullable(&mut self.stage, &patch.stage);
        patch_nullable(&mut self.close_date, &patch.close_date);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.title,
            self.value.as_ref(),
            &self.currency,
            &self.status,
            self.stage.as_deref(),
            self.close_date.as_ref(),
        )
    }

    /// Whether the deal still counts towards the open pipeline.
    pub fn is_active(&self) -> bool {
        self.status == DEAL_STATUS_ACTIVE
    }
}

impl Entity for Deal {
    const KIND: EntityKind = EntityKind::Deal;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_status() -> String {
    DEAL_STATUS_ACTIVE.to_string()
}

fn validate_fields(
    title: &str,
    value: Option<&Decimal>,
    currency: &str,
    status: &str,
    stage: Option<&str>,
    close_date: Option<&DateTime<Utc>>,
) -> ValidationResult {
    required_text("title", title, TITLE_MAX)?;
    decimal_18_2("value", value)?;
    required_text("currency", currency, CURRENCY_MAX)?;
    required_text("status", status, STATUS_MAX)?;
    optional_text("stage", stage, STAGE_MAX)?;
    optional_millisecond_timestamp("closeDate", close_date)
}
