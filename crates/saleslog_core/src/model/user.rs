//! User model.
//!
//! Users are the actors recorded as creator, uploader or author of other
//! records. Email is unique across the store (case-insensitive).

use super::validation::{required_email, required_text, ValidationResult};
use super::{patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = RecordId;

/// Role assigned when the caller does not provide one.
///
/// Roles form an open set; `Manager` is the role the export flow is meant for.
pub const DEFAULT_USER_ROLE: &str = "User";

const EMAIL_MAX: usize = 255;
const NAME_MAX: usize = 255;
const ROLE_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role: default_role(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(&self.email, &self.name, &self.role)
    }
}

impl User {
    pub fn apply(&mut self, patch: &UserPatch) {
        patch_required(&mut self.email, &patch.email);
        patch_required(&mut self.name, &patch.name);
        patch_required(&mut self.role, &patch.role);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(&self.email, &self.name, &self.role)
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn default_role() -> String {
    DEFAULT_USER_ROLE.to_string()
}

fn validate_fields(email: &str, name: &str, role: &str) -> ValidationResult {
    required_email("email", email, EMAIL_MAX)?;
    required_text("name", name, NAME_MAX)?;
    required_text("role", role, ROLE_MAX)
}

#[cfg(test)]
mod tests {
    use super::{NewUser, DEFAULT_USER_ROLE};

    #[test]
    fn new_user_defaults_role() {
        let user = NewUser::new("ana@contoso.com", "Ana");
        assert_eq!(user.role, DEFAULT_USER_ROLE);

        let parsed: NewUser =
            serde_json::from_str(r#"{"email": "bo@contoso.com", "name": "Bo"}"#).unwrap();
        assert_eq!(parsed.role, DEFAULT_USER_ROLE);
    }

    #[test]
    fn blank_role_is_rejected() {
        let user = NewUser::new("ana@contoso.com", "Ana").with_role(" ");
        assert!(user.validate().is_err());
    }
}
