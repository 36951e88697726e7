//! Tag repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Tag names are unique and compared exactly (case-sensitive).
//! - Deleting a tag removes its interaction links only.

use super::query::{Sort, SortKey};
use super::sql::{ensure_connection_ready, fetch_by_id, now, read_timestamp, to_millis, ListStatement};
use super::{MutableRecordRepository, RecordRepository, RepoError, RepoResult};
use crate::db::in_savepoint;
use crate::model::tag::{NewTag, Tag, TagPatch};
use crate::model::{EntityKind, RecordId};
use log::debug;
use rusqlite::{params, Connection, Row};

pub(crate) const TAG_SELECT_SQL: &str = "SELECT
    id,
    name,
    created_at
FROM tags";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSort {
    Name,
    CreatedAt,
}

impl SortKey for TagSort {
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Query options for listing tags.
#[derive(Debug, Clone, Default)]
pub struct TagListQuery {
    /// Case-insensitive substring over the tag name.
    pub search: Option<String>,
    /// Defaults to `name ASC`.
    pub sort: Option<Sort<TagSort>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tags")?;
        Ok(Self { conn })
    }

    /// Exact, case-sensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TAG_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tag_row(row)?));
        }
        Ok(None)
    }
}

impl RecordRepository for SqliteTagRepository<'_> {
    type Record = Tag;
    type New = NewTag;
    type Query = TagListQuery;

    fn insert(&self, new: &NewTag) -> RepoResult<Tag> {
        new.validate()?;

        in_savepoint(self.conn, || -> RepoResult<Tag> {
            self.conn.execute(
                "INSERT INTO tags (name, created_at) VALUES (?1, ?2);",
                params![new.name, to_millis(&now())],
            )?;
            let id = self.conn.last_insert_rowid();
            debug!("event=record_insert module=repo entity=Tag id={id}");
            self.get_required(id)
        })
    }

    fn get(&self, id: RecordId) -> RepoResult<Option<Tag>> {
        fetch_by_id(self.conn, TAG_SELECT_SQL, id, parse_tag_row)
    }

    fn query(&self, query: &TagListQuery) -> RepoResult<Vec<Tag>> {
        let mut statement = ListStatement::new(TAG_SELECT_SQL);
        statement.filter_contains(&["name"], query.search.as_deref());
        statement.order_by(query.sort.unwrap_or(Sort::asc(TagSort::Name)));
        statement.page(query.limit, query.offset);
        statement.fetch(self.conn, parse_tag_row)
    }

    fn delete(&self, id: RecordId) -> RepoResult<()> {
        in_savepoint(self.conn, || -> RepoResult<()> {
            let changed = self.conn.execute("DELETE FROM tags WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::not_found(EntityKind::Tag, id));
            }
            debug!("event=record_delete module=repo entity=Tag id={id}");
            Ok(())
        })
    }
}

impl MutableRecordRepository for SqliteTagRepository<'_> {
    type Patch = TagPatch;

    fn update(&self, id: RecordId, patch: &TagPatch) -> RepoResult<Tag> {
        in_savepoint(self.conn, || -> RepoResult<Tag> {
            let mut tag = self.get_required(id)?;
            tag.apply(patch);
            tag.validate()?;

            self.conn.execute(
                "UPDATE tags SET name = ?1 WHERE id = ?2;",
                params![tag.name, id],
            )?;
            debug!("event=record_update module=repo entity=Tag id={id}");
            self.get_required(id)
        })
    }
}

pub(crate) fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: read_timestamp(row, "created_at")?,
    })
}
