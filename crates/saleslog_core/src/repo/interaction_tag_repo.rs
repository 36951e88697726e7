//! Interaction/tag link repository.
//!
//! # Responsibility
//! - Own the `interaction_log_tags` join table.
//! - Provide atomic full-set replacement (`set_interaction_tags`).
//!
//! # Invariants
//! - Links only exist between existing interaction logs and tags.
//! - Linking an already linked pair is a no-op.
//! - Changing the tag set of an interaction refreshes its `updatedAt`.

use super::sql::{ensure_connection_ready, exists, now, to_millis};
use super::tag_repo::parse_tag_row;
use super::{RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::interaction::InteractionLogId;
use crate::model::tag::{Tag, TagId};
use crate::model::EntityKind;
use log::debug;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// SQLite-backed repository for interaction/tag links.
pub struct SqliteInteractionTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInteractionTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "interaction_log_tags")?;
        Ok(Self { conn })
    }

    /// Links `tag_id` to the interaction. Returns `false` when already linked.
    pub fn attach_tag(&self, interaction_id: InteractionLogId, tag_id: TagId) -> RepoResult<bool> {
        in_savepoint(self.conn, || -> RepoResult<bool> {
            self.ensure_interaction(interaction_id)?;
            self.ensure_tag(tag_id)?;

            let changed = self.conn.execute(
                "INSERT OR IGNORE INTO interaction_log_tags (interaction_log_id, tag_id)
                 VALUES (?1, ?2);",
                params![interaction_id, tag_id],
            )?;
            if changed > 0 {
                self.touch_interaction(interaction_id)?;
                debug!(
                    "event=tag_link module=repo interaction_id={} tag_id={}",
                    interaction_id, tag_id
                );
            }
            Ok(changed > 0)
        })
    }

    /// Removes one link. Returns `false` when the pair was not linked.
    pub fn detach_tag(&self, interaction_id: InteractionLogId, tag_id: TagId) -> RepoResult<bool> {
        in_savepoint(self.conn, || -> RepoResult<bool> {
            self.ensure_interaction(interaction_id)?;
            self.ensure_tag(tag_id)?;

            let changed = self.conn.execute(
                "DELETE FROM interaction_log_tags
                 WHERE interaction_log_id = ?1 AND tag_id = ?2;",
                params![interaction_id, tag_id],
            )?;
            if changed > 0 {
                self.touch_interaction(interaction_id)?;
                debug!(
                    "event=tag_unlink module=repo interaction_id={} tag_id={}",
                    interaction_id, tag_id
                );
            }
            Ok(changed > 0)
        })
    }

    /// Replaces the whole tag set of an interaction in one savepoint.
    ///
    /// Duplicate ids in `tag_ids` are collapsed. Any missing tag aborts the
    /// replacement and leaves the previous set intact.
    pub fn set_interaction_tags(
        &self,
        interaction_id: InteractionLogId,
        tag_ids: &[TagId],
    ) -> RepoResult<()> {
        let unique: BTreeSet<TagId> = tag_ids.iter().copied().collect();

        in_savepoint(self.conn, || -> RepoResult<()> {
            self.ensure_interaction(interaction_id)?;
            for tag_id in &unique {
                self.ensure_tag(*tag_id)?;
            }

            self.conn.execute(
                "DELETE FROM interaction_log_tags WHERE interaction_log_id = ?1;",
                [interaction_id],
            )?;
            for tag_id in &unique {
                self.conn.execute(
                    "INSERT INTO interaction_log_tags (interaction_log_id, tag_id)
                     VALUES (?1, ?2);",
                    params![interaction_id, tag_id],
                )?;
            }
            self.touch_interaction(interaction_id)?;
            debug!(
                "event=tag_set module=repo interaction_id={} tags={}",
                interaction_id,
                unique.len()
            );
            Ok(())
        })
    }

    /// Tags linked to the interaction, ordered by name.
    pub fn tags_for_interaction(&self, interaction_id: InteractionLogId) -> RepoResult<Vec<Tag>> {
        self.ensure_interaction(interaction_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.created_at
             FROM interaction_log_tags links
             INNER JOIN tags t ON t.id = links.tag_id
             WHERE links.interaction_log_id = ?1
             ORDER BY t.name ASC, t.id ASC;",
        )?;
        let mut rows = stmt.query([interaction_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    /// Ids of interactions carrying the tag, newest interaction first.
    pub fn interaction_ids_for_tag(&self, tag_id: TagId) -> RepoResult<Vec<InteractionLogId>> {
        self.ensure_tag(tag_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT links.interaction_log_id
             FROM interaction_log_tags links
             INNER JOIN interaction_logs logs ON logs.id = links.interaction_log_id
             WHERE links.tag_id = ?1
             ORDER BY logs.interaction_date DESC, logs.id DESC;",
        )?;
        let mut rows = stmt.query([tag_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn ensure_interaction(&self, interaction_id: InteractionLogId) -> RepoResult<()> {
        if exists(self.conn, "interaction_logs", interaction_id)? {
            return Ok(());
        }
        Err(RepoError::not_found(EntityKind::InteractionLog, interaction_id))
    }

    fn ensure_tag(&self, tag_id: TagId) -> RepoResult<()> {
        if exists(self.conn, "tags", tag_id)? {
            return Ok(());
        }
        Err(RepoError::not_found(EntityKind::Tag, tag_id))
    }

    fn touch_interaction(&self, interaction_id: InteractionLogId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE interaction_logs SET updated_at = ?1 WHERE id = ?2;",
            params![to_millis(&now()), interaction_id],
        )?;
        Ok(())
    }
}
