//! Audited record use-case service.
//!
//! # Responsibility
//! - Provide create/update/delete entry points that leave an audit trail.
//! - Delegate persistence to any [`RecordRepository`] implementation.
//!
//! # Invariants
//! - A write and its audit entry commit or roll back together.
//! - Snapshots are taken from the stored record, never from caller input.
//! - Reads are passed through unchanged and are not audited.

use crate::db::in_savepoint;
use crate::model::audit::{AuditAction, NewAuditLog};
use crate::model::user::UserId;
use crate::model::{Entity, RecordId};
use crate::repo::audit_repo::SqliteAuditLogRepository;
use crate::repo::{MutableRecordRepository, RecordRepository, RepoResult};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Fields that change on every write and are left out of update diffs.
const DIFF_IGNORED_FIELDS: &[&str] = &["updatedAt"];

/// Who performed a write, recorded on every audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: Option<UserId>,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ip_address: None,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

/// Wraps a repository so that every write appends an [`AuditLog`] entry.
///
/// [`AuditLog`]: crate::model::audit::AuditLog
pub struct RecordService<'conn, R> {
    conn: &'conn Connection,
    repo: R,
    audit: SqliteAuditLogRepository<'conn>,
}

impl<'conn, R> RecordService<'conn, R>
where
    R: RecordRepository,
    R::Record: Serialize,
{
    /// Creates a service over `repo`, which must be bound to `conn`.
    pub fn new(conn: &'conn Connection, repo: R) -> RepoResult<Self> {
        let audit = SqliteAuditLogRepository::try_new(conn)?;
        Ok(Self { conn, repo, audit })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Inserts the record and audits it with a full snapshot.
    pub fn create(&self, context: &AuditContext, new: &R::New) -> RepoResult<R::Record> {
        in_savepoint(self.conn, || -> RepoResult<R::Record> {
            let record = self.repo.insert(new)?;
            let snapshot = serde_json::to_value(&record)?;
            self.append(context, record.id(), AuditAction::Create, snapshot)?;
            Ok(record)
        })
    }

    pub fn get(&self, id: RecordId) -> RepoResult<Option<R::Record>> {
        self.repo.get(id)
    }

    pub fn query(&self, query: &R::Query) -> RepoResult<Vec<R::Record>> {
        self.repo.query(query)
    }

    /// Deletes the record and audits the snapshot it had before removal.
    ///
    /// A refused delete leaves no audit entry behind.
    pub fn delete(&self, context: &AuditContext, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let record = self.repo.get_required(id)?;
            let snapshot = serde_json::to_value(&record)?;
            self.append(context, id, AuditAction::Delete, snapshot)?;
            self.repo.delete(id)
        })
    }

    fn append(
        &self,
        context: &AuditContext,
        entity_id: RecordId,
        action: AuditAction,
        changes: Value,
    ) -> RepoResult<()> {
        let mut entry = NewAuditLog::new(<R::Record as Entity>::KIND, entity_id, action);
        entry.user_id = context.user_id;
        entry.ip_address = context.ip_address.clone();
        entry.changes = Some(changes);
        self.audit.insert(&entry)?;
        Ok(())
    }
}

impl<R> RecordService<'_, R>
where
    R: MutableRecordRepository,
    R::Record: Serialize,
{
    /// Applies the patch and audits the changed fields as `{from, to}` pairs.
    pub fn update(
        &self,
        context: &AuditContext,
        id: RecordId,
        patch: &R::Patch,
    ) -> RepoResult<R::Record> {
        in_savepoint(self.conn, || -> RepoResult<R::Record> {
            let before = serde_json::to_value(self.repo.get_required(id)?)?;
            let record = self.repo.update(id, patch)?;
            let after = serde_json::to_value(&record)?;
            self.append(context, id, AuditAction::Update, field_diff(&before, &after))?;
            Ok(record)
        })
    }
}

/// Field-level diff of two serialized records.
pub(crate) fn field_diff(before: &Value, after: &Value) -> Value {
    let (Value::Object(before), Value::Object(after)) = (before, after) else {
        return json!({ "from": before, "to": after });
    };

    let mut diff = Map::new();
    for (field, new_value) in after {
        if DIFF_IGNORED_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let old_value = before.get(field).unwrap_or(&Value::Null);
        if old_value != new_value {
            diff.insert(field.clone(), json!({ "from": old_value, "to": new_value }));
        }
    }
    Value::Object(diff)
}

#[cfg(test)]
mod tests {
    use super::field_diff;
    use serde_json::json;

    #[test]
    fn field_diff_keeps_only_changed_fields() {
        let before = json!({"id": 1, "name": "Contoso", "industry": null, "updatedAt": "a"});
        let after = json!({"id": 1, "name": "Contoso Ltd", "industry": "Tech", "updatedAt": "b"});

        assert_eq!(
            field_diff(&before, &after),
            json!({
                "name": {"from": "Contoso", "to": "Contoso Ltd"},
                "industry": {"from": null, "to": "Tech"}
            })
        );
    }

    #[test]
    fn field_diff_is_empty_for_identical_records() {
        let record = json!({"id": 7, "name": "Fabrikam"});
        assert_eq!(field_diff(&record, &record), json!({}));
    }
}
