//! Customer model.

use super::user::UserId;
use super::validation::{
    optional_email, optional_reference, optional_text, required_text, ValidationResult,
};
use super::{double_option, patch_nullable, patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CustomerId = RecordId;

const NAME_MAX: usize = 255;
const INDUSTRY_MAX: usize = 100;
const CONTACT_EMAIL_MAX: usize = 255;
const CONTACT_PHONE_MAX: usize = 50;
const ADDRESS_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub industry: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    /// Nulled when the creating user is deleted.
    pub created_by_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub address: Option<Option<String>>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.industry.as_deref(),
            self.contact_email.as_deref(),
            self.contact_phone.as_deref(),
            self.address.as_deref(),
        )?;
        optional_reference("createdByUserId", self.created_by_user_id)
    }
}

impl Customer {
    pub fn apply(&mut self, patch: &CustomerPatch) {
        patch_required(&mut self.name, &patch.name);
        patch_nullable(&mut self.industry, &patch.industry);
        patch_nullable(&mut self.contact_email, &patch.contact_email);
        patch_nullable(&mut self.contact_phone, &patch.contact_phone);
        patch_nullable(&mut self.address, &patch.address);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.industry.as_deref(),
            self.contact_email.as_deref(),
            self.contact_phone.as_deref(),
            self.address.as_deref(),
        )
    }
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn validate_fields(
    name: &str,
    industry: Option<&str>,
    contact_email: Option<&str>,
    contact_phone: Option<&str>,
    address: Option<&str>,
) -> ValidationResult {
    required_text("name", name, NAME_MAX)?;
    optional_text("industry", industry, INDUSTRY_MAX)?;
    optional_email("contactEmail", contact_email, CONTACT_EMAIL_MAX)?;
    optional_text("contactPhone", contact_phone, CONTACT_PHONE_MAX)?;
    optional_text("address", address, ADDRESS_MAX)
}
