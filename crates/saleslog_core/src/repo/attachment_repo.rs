//! Attachment repository contracts and SQLite implementation.

use super::query::{Sort, SortKey};
use super::sql::{ensure_connection_ready, fetch_by_id, now, read_timestamp, to_millis, ListStatement};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::attachment::{Attachment, AttachmentPatch, NewAttachment};
use crate::model::interaction::InteractionLogId;
use crate::model::user::UserId;
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};

const ATTACHMENT_SELECT_SQL: &str = "SELECT
    id,
    interaction_log_id,
    file_name,
    blob_uri,
    file_size,
    content_type,
    uploaded_by_user_id,
    uploaded_at
FROM attachments";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSort {
    UploadedAt,
    FileName,
    FileSize,
}

impl SortKey for AttachmentSort {
    fn column(self) -> &'static str {
        match self {
            Self::UploadedAt => "uploaded_at",
            Self::FileName => "file_name",
            Self::FileSize => "file_size",
        }
    }
}

/// Query options for listing attachments.
#[derive(Debug, Clone, Default)]
pub struct AttachmentListQuery {
    pub interaction_log_id: Option<InteractionLogId>,
    pub uploaded_by_user_id: Option<UserId>,
    pub content_type: Option<String>,
    /// Defaults to `uploadedAt DESC`.
    pub sort: Option<Sort<AttachmentSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed attachment repository.
pub struct SqliteAttachmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttachmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "attachments")?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteAttachmentRepository<'_> {
    type Record = Attachment;
    type New = NewAttachment;
    type Query = AttachmentListQuery;

    fn insert(&self, new: &NewAttachment) -> RepoResult<Attachment> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<Attachment> {
            self.conn.execute(
                "INSERT INTO attachments (
                    interaction_log_id,
                    file_name,
                    blob_uri,
                    file_size,
                    content_type,
                    uploaded_by_user_id,
                    uploaded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    new.interaction_log_id,
                    new.file_name,
                    new.blob_uri,
                    new.file_size,
                    new.content_type,
                    new.uploaded_by_user_id,
                    to_millis(&now()),
                ],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=Attachment id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Attachment>> {
        fetch_by_id(self.conn, ATTACHMENT_SELECT_SQL, id, parse_attachment_row)
    }

    fn query(&self, query: &AttachmentListQuery) -> RepoResult<Vec<Attachment>> {
        let mut statement = ListStatement::new(ATTACHMENT_SELECT_SQL);
        statement.filter_eq("interaction_log_id", query.interaction_log_id);
        statement.filter_eq("uploaded_by_user_id", query.uploaded_by_user_id);
        statement.filter_eq("content_type", query.content_type.clone());
        statement.order_by(query.sort.unwrap_or(Sort::desc(AttachmentSort::UploadedAt)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_attachment_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let changed = self
                .conn
                .execute("DELETE FROM attachments WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::Attachment, id));
            }
            debug!("event=record_delete module=repo entity=Attachment id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteAttachmentRepository<'_> {
    type Patch = AttachmentPatch;

    /// Attachments carry no update timestamp; `uploadedAt` is left untouched.
    fn update(&self, id: RecordId, patch: &AttachmentPatch) -> RepoResult<Attachment> {
        in_savepoint(self.conn, || -> RepoResult<Attachment> {
            let mut attachment = self.get_required(id)?;
            attachment.apply(patch);
            attachment.validate()?;

            self.conn.execute(
                "UPDATE attachments
                 SET
                    file_name = ?1,
                    blob_uri = ?2,
                    file_size = ?3,
                    content_type = ?4
                 WHERE id = ?5;",
                params![
                    attachment.file_name,
                    attachment.blob_uri,
                    attachment.file_size,
                    attachment.content_type,
                    id,
                ],
            )?;
            debug!("event=record_update module=repo entity=Attachment id={id}");
            self.get_required(id)
        })
    }
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    Ok(Attachment {
        id: row.get("id")?,
        interaction_log_id: row.get("interaction_log_id")?,
        file_name: row.get("file_name")?,
        blob_uri: row.get("blob_uri")?,
        file_size: row.get("file_size")?,
        content_type: row.get("content_type")?,
        uploaded_by_user_id: row.get("uploaded_by_user_id")?,
        uploaded_at: read_timestamp(row, "uploaded_at")?,
    })
}
