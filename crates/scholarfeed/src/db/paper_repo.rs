//! Paper repository: the `papers` table, keyed by a unique normalized link.

use rusqlite::{params, OptionalExtension, Row};

use crate::paper::{Enrichment, PaperId, PaperRecord, ReferenceLink};

use super::{Database, DatabaseError};

/// A raw paper row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRow {
    pub id: i64,
    pub link: String,
    pub title: String,
    pub abstract_text: String,
    pub summary: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub applications: Option<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl PaperRow {
    /// Converts the row back into a domain record. Enrichment is present when
    /// any enrichment column is populated.
    pub fn into_record(self) -> PaperRecord {
        let enrichment = if self.summary.is_some()
            || self.highlights.is_some()
            || self.applications.is_some()
        {
            Some(Enrichment {
                summary: self.summary.unwrap_or_default(),
                highlights: self.highlights.unwrap_or_default(),
                applications: self.applications.unwrap_or_default(),
            })
        } else {
            None
        };

        PaperRecord {
            title: self.title,
            link: ReferenceLink::from_stored(self.link),
            abstract_text: self.abstract_text,
            enrichment,
        }
    }
}

/// Result of [`upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub paper_id: PaperId,
    /// True when the link had never been stored before.
    pub was_new: bool,
}

/// Enrichment columns as stored: `NULL` means absent. Empty values are never
/// written, so a blank annotation cannot mask an earlier one.
struct EnrichmentColumns {
    summary: Option<String>,
    highlights: Option<String>,
    applications: Option<String>,
}

impl EnrichmentColumns {
    fn from_record(record: &PaperRecord) -> Result<Self, DatabaseError> {
        let Some(enrichment) = record.enrichment.as_ref() else {
            return Ok(Self {
                summary: None,
                highlights: None,
                applications: None,
            });
        };

        let summary = Some(enrichment.summary.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self {
            summary,
            highlights: encode_list("highlights", &enrichment.highlights)?,
            applications: encode_list("applications", &enrichment.applications)?,
        })
    }

    fn any(&self) -> bool {
        self.summary.is_some() || self.highlights.is_some() || self.applications.is_some()
    }
}

fn encode_list(column: &'static str, items: &[String]) -> Result<Option<String>, DatabaseError> {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&items)
        .map(Some)
        .map_err(|source| DatabaseError::ListColumn { column, source })
}

fn decode_list(column: &'static str, raw: Option<String>) -> Result<Option<Vec<String>>, DatabaseError> {
    raw.map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|source| DatabaseError::ListColumn { column, source })
}

/// Inserts a paper if its link is unseen. For an existing link, fills in
/// enrichment columns that are still empty and leaves everything else alone.
///
/// The UNIQUE constraint on `link` guarantees at most one row per paper.
pub fn upsert(db: &Database, record: &PaperRecord, now: &str) -> Result<UpsertOutcome, DatabaseError> {
    let columns = EnrichmentColumns::from_record(record)?;

    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT INTO papers (link, title, abstract_text, summary, highlights, applications, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(link) DO NOTHING",
            params![
                record.link.as_str(),
                record.title,
                record.abstract_text,
                columns.summary,
                columns.highlights,
                columns.applications,
                now,
            ],
        )?;

        if inserted == 1 {
            return Ok(UpsertOutcome {
                paper_id: PaperId(conn.last_insert_rowid()),
                was_new: true,
            });
        }

        let id: i64 = conn.query_row(
            "SELECT id FROM papers WHERE link = ?1",
            params![record.link.as_str()],
            |r| r.get(0),
        )?;

        if columns.any() {
            conn.execute(
                "UPDATE papers SET
                   summary = COALESCE(summary, ?2),
                   highlights = COALESCE(highlights, ?3),
                   applications = COALESCE(applications, ?4),
                   updated_at = ?5
                 WHERE id = ?1
                   AND ((summary IS NULL AND ?2 IS NOT NULL)
                     OR (highlights IS NULL AND ?3 IS NOT NULL)
                     OR (applications IS NULL AND ?4 IS NOT NULL))",
                params![
                    id,
                    columns.summary,
                    columns.highlights,
                    columns.applications,
                    now
                ],
            )?;
        }

        Ok(UpsertOutcome {
            paper_id: PaperId(id),
            was_new: false,
        })
    })
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<(PaperRow, Option<String>, Option<String>)> {
    Ok((
        PaperRow {
            id: row.get(0)?,
            link: row.get(1)?,
            title: row.get(2)?,
            abstract_text: row.get(3)?,
            summary: row.get(4)?,
            highlights: None,
            applications: None,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        },
        row.get(5)?,
        row.get(6)?,
    ))
}

fn finish_row(
    (mut row, highlights, applications): (PaperRow, Option<String>, Option<String>),
) -> Result<PaperRow, DatabaseError> {
    row.highlights = decode_list("highlights", highlights)?;
    row.applications = decode_list("applications", applications)?;
    Ok(row)
}

const SELECT_COLUMNS: &str = "SELECT id, link, title, abstract_text, summary, highlights, applications, created_at, updated_at FROM papers";

/// Finds a paper by its normalized link.
pub fn find_by_link(db: &Database, link: &ReferenceLink) -> Result<Option<PaperRow>, DatabaseError> {
    db.with_conn(|conn| {
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE link = ?1"),
                params![link.as_str()],
                map_row,
            )
            .optional()?;
        raw.map(finish_row).transpose()
    })
}

/// Returns true when the paper stored under `link` already has a summary.
pub fn is_enriched(db: &Database, link: &ReferenceLink) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT 1 FROM papers WHERE link = ?1 AND summary IS NOT NULL",
                params![link.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    })
}

/// Lists all papers in insertion order.
pub fn list_all(db: &Database) -> Result<Vec<PaperRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let raw = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(finish_row).collect()
    })
}

/// Counts all stored papers.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |r| r.get(0))?;
        Ok(count)
    })
}

/// Counts papers that carry a summary.
pub fn count_enriched(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE summary IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
