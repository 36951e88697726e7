//! Attachment model. The file body lives in external object storage; the
//! store keeps only its URI and metadata.

use super::interaction::InteractionLogId;
use super::user::UserId;
use super::validation::{
    non_negative, optional_reference, optional_text, reference, required_text, ValidationResult,
};
use super::{double_option, patch_nullable, patch_required, Entity, EntityKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AttachmentId = RecordId;

const FILE_NAME_MAX: usize = 255;
const BLOB_URI_MAX: usize = 1000;
const CONTENT_TYPE_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub interaction_log_id: InteractionLogId,
    pub file_name: String,
    pub blob_uri: String,
    pub file_size: Option<i64>,
    pub content_type: Option<String>,
    /// Nulled when the uploading user is deleted.
    pub uploaded_by_user_id: Option<UserId>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub interaction_log_id: InteractionLogId,
    pub file_name: String,
    pub blob_uri: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub uploaded_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPatch {
    pub file_name: Option<String>,
    pub blob_uri: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub file_size: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub content_type: Option<Option<String>>,
}

impl NewAttachment {
    pub fn new(
        interaction_log_id: InteractionLogId,
        file_name: impl Into<String>,
        blob_uri: impl Into<String>,
    ) -> Self {
        Self {
            interaction_log_id,
            file_name: file_name.into(),
            blob_uri: blob_uri.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ValidationResult {
        reference("interactionLogId", self.interaction_log_id)?;
        optional_reference("uploadedByUserId", self.uploaded_by_user_id)?;
        validate_fields(
            &self.file_name,
            &self.blob_uri,
            self.file_size,
            self.content_type.as_deref(),
        )
    }
}

impl Attachment {
    pub fn apply(&mut self, patch: &AttachmentPatch) {
        patch_required(&mut self.file_name, &patch.file_name);
        patch_required(&mut self.blob_uri, &patch.blob_uri);
        patch_nullable(&mut self.file_size, &patch.file_size);
        patch_nullable(&mut self.content_type, &patch.content_type);
    }

    pub fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.file_name,
            &self.blob_uri,
            self.file_size,
            self.content_type.as_deref(),
        )
    }
}

impl Entity for Attachment {
    const KIND: EntityKind = EntityKind::Attachment;

    fn id(&self) -> RecordId {
        self.id
    }
}

fn validate_fields(
    file_name: &str,
    blob_uri: &str,
    file_size: Option<i64>,
    content_type: Option<&str>,
) -> ValidationResult {
    required_text("fileName", file_name, FILE_NAME_MAX)?;
    required_text("blobUri", blob_uri, BLOB_URI_MAX)?;
    non_negative("fileSize", file_size)?;
    optional_text("contentType", content_type, CONTENT_TYPE_MAX)
}
