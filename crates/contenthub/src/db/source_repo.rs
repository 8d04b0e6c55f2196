//! Row-level operations on the `sources` table.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::jobs::{JobStatus, JobType};
use crate::source::{Source, SourceType, SourceUpdate};

const SELECT_COLUMNS: &str = "source_id, title, url, source_type, created, video, \
     import_status, transcript_status, text_insights_status, image_insights_status";

/// Timestamps are stored with fixed precision so text order equals time order.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(source_id: &str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidRow {
            source_id: source_id.to_string(),
            column: "created",
            value: s.to_string(),
        })
}

fn parse_status(
    source_id: &str,
    column: &'static str,
    s: &str,
) -> Result<JobStatus, DatabaseError> {
    JobStatus::parse(s).ok_or_else(|| DatabaseError::InvalidRow {
        source_id: source_id.to_string(),
        column,
        value: s.to_string(),
    })
}

/// Raw column values, decoded into a `Source` outside the rusqlite closure.
struct RawSource {
    source_id: String,
    title: String,
    url: Option<String>,
    source_type: String,
    created: String,
    video: Option<String>,
    statuses: [String; 4],
}

impl RawSource {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            source_id: row.get("source_id")?,
            title: row.get("title")?,
            url: row.get("url")?,
            source_type: row.get("source_type")?,
            created: row.get("created")?,
            video: row.get("video")?,
            statuses: [
                row.get("import_status")?,
                row.get("transcript_status")?,
                row.get("text_insights_status")?,
                row.get("image_insights_status")?,
            ],
        })
    }

    fn decode(self) -> Result<Source, DatabaseError> {
        let id = self.source_id.as_str();
        let source_type =
            SourceType::parse(&self.source_type).ok_or_else(|| DatabaseError::InvalidRow {
                source_id: self.source_id.clone(),
                column: "source_type",
                value: self.source_type.clone(),
            })?;
        let created = parse_timestamp(id, &self.created)?;
        let [import, transcript, text, image] = &self.statuses;

        Ok(Source {
            import_status: parse_status(id, "import_status", import)?,
            transcript_status: parse_status(id, "transcript_status", transcript)?,
            text_insights_status: parse_status(id, "text_insights_status", text)?,
            image_insights_status: parse_status(id, "image_insights_status", image)?,
            title: self.title,
            url: self.url,
            source_type,
            created,
            video: self.video,
            source_id: self.source_id,
        })
    }
}

/// Inserts a new source row.
pub fn insert(db: &Database, source: &Source) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO sources (source_id, title, url, source_type, created, video,
             import_status, transcript_status, text_insights_status, image_insights_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                source.source_id,
                source.title,
                source.url,
                source.source_type.as_str(),
                format_timestamp(source.created),
                source.video,
                source.import_status.as_str(),
                source.transcript_status.as_str(),
                source.text_insights_status.as_str(),
                source.image_insights_status.as_str(),
            ],
        )?;
        Ok(())
    })
}

/// Finds a source by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Source>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        let sql = format!("SELECT {} FROM sources WHERE source_id = ?1", SELECT_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id], RawSource::from_row)
            .optional()?)
    })?;
    raw.map(RawSource::decode).transpose()
}

/// Lists all sources, newest first.
pub fn list(db: &Database) -> Result<Vec<Source>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM sources ORDER BY created DESC, source_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RawSource::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(RawSource::decode).collect()
}

/// Merges the supplied fields into the row. `url` and `video` are written
/// whenever present, so `Some(None)` stores NULL. Returns `false` if no row
/// matched.
pub fn update_fields(db: &Database, id: &str, update: &SourceUpdate) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE sources SET
               title = COALESCE(?2, title),
               url = CASE WHEN ?3 THEN ?4 ELSE url END,
               source_type = COALESCE(?5, source_type),
               video = CASE WHEN ?6 THEN ?7 ELSE video END
             WHERE source_id = ?1",
            params![
                id,
                update.title,
                update.url.is_some(),
                update.url.as_ref().and_then(|u| u.as_deref()),
                update.source_type.map(|t| t.as_str()),
                update.video.is_some(),
                update.video.as_ref().and_then(|v| v.as_deref()),
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes a source row. Returns `false` if no row matched.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM sources WHERE source_id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

/// Unconditionally writes one job status column.
pub fn set_status(
    db: &Database,
    id: &str,
    job: JobType,
    status: JobStatus,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "UPDATE sources SET {} = ?2 WHERE source_id = ?1",
            job.status_column()
        );
        let changed = conn.execute(&sql, params![id, status.as_str()])?;
        Ok(changed > 0)
    })
}

/// Writes one job status column only if it still holds `expected`.
/// Returns `false` when the row is missing or the value changed underneath.
pub fn compare_and_set_status(
    db: &Database,
    id: &str,
    job: JobType,
    expected: JobStatus,
    next: JobStatus,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let column = job.status_column();
        let sql = format!(
            "UPDATE sources SET {column} = ?3 WHERE source_id = ?1 AND {column} = ?2"
        );
        let changed = conn.execute(&sql, params![id, expected.as_str(), next.as_str()])?;
        Ok(changed > 0)
    })
}
