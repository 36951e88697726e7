//! Contact model. A contact belongs to exactly one customer.

use super::customer::CustomerId;
use super::validation::{optional_email, optional_text, reference, required_text, ValidationResult};
use super::{double_option, patch_nullable, patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ContactId = RecordId;

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;
const PHONE_MAX: usize = 50;
const TITLE_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub customer_id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub title: Option<Option<String>>,
    pub is_primary: Option<bool>,
}

impl NewContact {
    pub fn new(customer_id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            customer_id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ValidationResult {
        reference("customerId", self.customer_id)?;
        validate_fields(
            &self.name,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.title.as_deref(),
        )
    }
}

impl Contact {
    pub fn apply(&mut self, patch: &ContactPatch) {
        patch_required(&mut self.name, &patch.name);
        patch_nullable(&mut self.email, &patch.email);
        patch_nullable(&mut self.phone, &patch.phone);
        patch_nullable(&mut self.title, &patch.title);
        patch_required(&mut self.is_primary, &patch.is_primary);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.title.as_deref(),
        )
    }
}

impl Entity for Contact {
    const KIND: EntityKind = EntityKind::Contact;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn validate_fields(
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    title: Option<&str>,
) -> ValidationResult {
    required_text("name", name, NAME_MAX)?;
    optional_email("email", email, EMAIL_MAX)?;
    optional_text("phone", phone, PHONE_MAX)?;
    optional_text("title", title, TITLE_MAX)
}
