//! SQL helpers shared by the entity repositories.

use super::query::{Sort, SortKey};
use super::{ConstraintKind, ConstraintViolation, RepoError, RepoResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::model::{EntityKind, RecordId};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// Dynamic `SELECT ... WHERE` builder for list queries.
///
/// Filters are appended as `AND` clauses with positional binds, the same way
/// for every entity.
pub(crate) struct ListStatement {
    sql: String,
    binds: Vec<Value>,
}

impl ListStatement {
    pub(crate) fn new(select_sql: &str) -> Self {
        Self {
            sql: format!("{select_sql} WHERE 1 = 1"),
            binds: Vec::new(),
        }
    }

    pub(crate) fn filter_eq<V: Into<Value>>(&mut self, column: &str, value: Option<V>) {
        if let Some(value) = value {
            self.sql.push_str(&format!(" AND {column} = ?"));
            self.binds.push(value.into());
        }
    }

    /// Case-insensitive substring match over any of `columns`.
    ///
    /// Blank needles add no filter.
    pub(crate) fn filter_contains(&mut self, columns: &[&str], needle: Option<&str>) {
        let Some(needle) = needle.filter(|value| !value.trim().is_empty()) else {
            return;
        };

        let pattern = like_pattern(needle);
        let clauses = columns
            .iter()
            .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>();
        self.sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        for _ in columns {
            self.binds.push(Value::Text(pattern.clone()));
        }
    }

    /// Half-open time window: `from` inclusive, `to` exclusive.
    pub(crate) fn filter_range(
        &mut self,
        column: &str,
        from: Option<&DateTime<Utc>>,
        to: Option<&DateTime<Utc>>,
    ) {
        if let Some(from) = from {
            self.sql.push_str(&format!(" AND {column} >= ?"));
            self.binds.push(Value::Integer(to_millis(from)));
        }
        if let Some(to) = to {
            self.sql.push_str(&format!(" AND {column} < ?"));
            self.binds.push(Value::Integer(to_millis(to)));
        }
    }

    /// Appends a raw clause containing exactly one `?` placeholder.
    pub(crate) fn filter_clause<V: Into<Value>>(&mut self, clause: &str, value: Option<V>) {
        if let Some(value) = value {
            self.sql.push_str(" AND ");
            self.sql.push_str(clause);
            self.binds.push(value.into());
        }
    }

    pub(crate) fn order_by<K: SortKey>(&mut self, sort: Sort<K>) {
        let direction = sort.direction.as_sql();
        self.sql.push_str(&format!(
            " ORDER BY {} {direction}, id {direction}",
            sort.key.column()
        ));
    }

    pub(crate) fn page(&mut self, limit: Option<u32>, offset: u32) {
        if let Some(limit) = limit {
            self.sql.push_str(" LIMIT ?");
            self.binds.push(Value::Integer(i64::from(limit)));
            if offset > 0 {
                self.sql.push_str(" OFFSET ?");
                self.binds.push(Value::Integer(i64::from(offset)));
            }
        } else if offset > 0 {
            self.sql.push_str(" LIMIT -1 OFFSET ?");
            self.binds.push(Value::Integer(i64::from(offset)));
        }
    }

    pub(crate) fn fetch<T, F>(self, conn: &Connection, parse: F) -> RepoResult<Vec<T>>
    where
        F: Fn(&Row<'_>) -> RepoResult<T>,
    {
        let mut stmt = conn.prepare(&self.sql)?;
        let mut rows = stmt.query(params_from_iter(self.binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse(row)?);
        }
        Ok(records)
    }
}

/// Builds a `LIKE` pattern that matches `needle` literally anywhere.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Loads a single row by id with `select_sql` + `WHERE id = ?1`.
pub(crate) fn fetch_by_id<T, F>(
    conn: &Connection,
    select_sql: &str,
    id: RecordId,
    parse: F,
) -> RepoResult<Option<T>>
where
    F: Fn(&Row<'_>) -> RepoResult<T>,
{
    let mut stmt = conn.prepare(&format!("{select_sql} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse(row)?));
    }
    Ok(None)
}

/// Server-side clock read, truncated to the stored millisecond precision.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn to_millis(value: &DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub(crate) fn read_timestamp(row: &Row<'_>, column: &'static str) -> RepoResult<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{millis}` out of range in {column}"))
    })
}

pub(crate) fn read_optional_timestamp(
    row: &Row<'_>,
    column: &'static str,
) -> RepoResult<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(column)? {
        Some(millis) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| {
                RepoError::InvalidData(format!("timestamp `{millis}` out of range in {column}"))
            }),
        None => Ok(None),
    }
}

pub(crate) fn read_bool(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Runs a `SELECT COUNT(*) ...` bound to one id.
pub(crate) fn count_by_id(conn: &Connection, sql: &str, id: RecordId) -> RepoResult<i64> {
    let count: i64 = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(count)
}

pub(crate) fn exists(conn: &Connection, table: &str, id: RecordId) -> RepoResult<bool> {
    let found: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(found == 1)
}

/// Refuses a delete that would orphan NO-ACTION dependents.
pub(crate) fn refuse_delete_with_dependents(
    entity: EntityKind,
    id: RecordId,
    dependents: i64,
) -> RepoResult<()> {
    if dependents == 0 {
        return Ok(());
    }

    warn!(
        "event=record_delete_blocked module=repo entity={} id={} dependents={}",
        entity, id, dependents
    );
    Err(ConstraintViolation::new(
        ConstraintKind::Dependents,
        format!(
            "{entity} {id} is still referenced by {dependents} interaction log(s); reassign or remove them first"
        ),
    )
    .into())
}

/// Checks that `conn` is migrated, enforces foreign keys and has `table`.
pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?;
    if foreign_keys != 1 {
        return Err(RepoError::ForeignKeysDisabled);
    }

    let table_found: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if table_found != 1 {
        return Err(RepoError::MissingRequiredTable(table));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("con"), "%con%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
