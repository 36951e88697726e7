//! CSV export of the interaction timeline.
//!
//! # Invariants
//! - Rows are ordered by interaction date, newest first (ties by id DESC).
//! - Fields containing commas, quotes or line breaks are quoted with inner
//!   quotes doubled; all other fields are written verbatim.
//! - Lines end with CRLF.

use crate::repo::sql::read_timestamp;
use crate::repo::RepoError;
use log::info;
use rusqlite::Connection;
use std::io::Write;
use thiserror::Error;

pub const INTERACTION_CSV_HEADER: [&str; 7] =
    ["Id", "Date", "Type", "Subject", "Customer", "Deal", "User"];

const INTERACTION_EXPORT_SQL: &str = "SELECT
    logs.id,
    logs.interaction_date,
    logs.type,
    logs.subject,
    customers.name AS customer_name,
    deals.title AS deal_title,
    users.name AS user_name
FROM interaction_logs logs
INNER JOIN customers ON customers.id = logs.customer_id
INNER JOIN deals ON deals.id = logs.deal_id
INNER JOIN users ON users.id = logs.user_id
ORDER BY logs.interaction_date DESC, logs.id DESC;";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ExportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Writes every interaction log as CSV and returns the number of data rows.
pub fn export_interactions_csv<W: Write>(
    conn: &Connection,
    mut writer: W,
) -> Result<usize, ExportError> {
    write_record(&mut writer, &INTERACTION_CSV_HEADER)?;

    let mut stmt = conn.prepare(INTERACTION_EXPORT_SQL)?;
    let mut rows = stmt.query([])?;
    let mut written = 0usize;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get("id")?;
        let date = read_timestamp(row, "interaction_date")?;
        let kind: String = row.get("type")?;
        let subject: String = row.get("subject")?;
        let customer: String = row.get("customer_name")?;
        let deal: String = row.get("deal_title")?;
        let user: String = row.get("user_name")?;

        write_record(
            &mut writer,
            &[
                id.to_string().as_str(),
                date.format("%Y-%m-%d").to_string().as_str(),
                &kind,
                &subject,
                &customer,
                &deal,
                &user,
            ],
        )?;
        written += 1;
    }
    writer.flush()?;

    info!("event=export_interactions module=export status=ok rows={written}");
    Ok(written)
}

fn write_record<W: Write>(writer: &mut W, fields: &[&str]) -> std::io::Result<()> {
    let line = fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",");
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")
}

pub(crate) fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::escape_field;

    #[test]
    fn escape_field_leaves_plain_text_alone() {
        assert_eq!(escape_field("Kickoff"), "Kickoff");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn escape_field_quotes_separators_and_doubles_quotes() {
        assert_eq!(escape_field("Contoso, Ltd"), "\"Contoso, Ltd\"");
        assert_eq!(escape_field("the \"big\" one"), "\"the \"\"big\"\" one\"");
        assert_eq!(escape_field("line1\nline2"), "\"line1\nline2\"");
    }
}
