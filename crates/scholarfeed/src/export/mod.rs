//! Tabular snapshot of every stored paper.
//!
//! The export is a pure projection of the database: one row per paper in
//! insertion order, list fields joined with `", "`, enrichment columns empty
//! when absent. The file is written next to its destination and renamed into
//! place, so readers never see a half-written export.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::db::{paper_repo, Database, DatabaseError};
use crate::paper::PaperRecord;

pub use crate::config::ExportFormat;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to read papers: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One exported row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub title: String,
    pub link: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub summary: String,
    pub highlights: String,
    pub applications: String,
}

impl From<PaperRecord> for ExportRow {
    fn from(record: PaperRecord) -> Self {
        let enrichment = record.enrichment.unwrap_or_default();
        Self {
            title: record.title,
            link: record.link.to_string(),
            abstract_text: record.abstract_text,
            summary: enrichment.summary,
            highlights: enrichment.highlights.join(", "),
            applications: enrichment.applications.join(", "),
        }
    }
}

/// Reads every stored paper as an export row.
pub fn collect_rows(db: &Database) -> Result<Vec<ExportRow>, ExportError> {
    Ok(paper_repo::list_all(db)?
        .into_iter()
        .map(|row| ExportRow::from(row.into_record()))
        .collect())
}

/// Writes the snapshot to `path` and returns the number of rows written.
pub fn export_snapshot(db: &Database, path: &Path, format: ExportFormat) -> Result<usize, ExportError> {
    let rows = collect_rows(db)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let partial = partial_path(path);
    let result = write_rows(&partial, &rows, format).and_then(|_| {
        fs::rename(&partial, path).map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result?;

    info!("Exported {} papers to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export".into());
    name.push(".partial");
    path.with_file_name(name)
}

fn write_rows(path: &Path, rows: &[ExportRow], format: ExportFormat) -> Result<(), ExportError> {
    let io_err = |e: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);

    match format {
        ExportFormat::Csv => {
            // Spreadsheet tools need the BOM to detect UTF-8.
            out.write_all(UTF8_BOM).map_err(io_err)?;
            let mut writer = csv::Writer::from_writer(&mut out);
            if rows.is_empty() {
                writer.write_record(["title", "link", "abstract", "summary", "highlights", "applications"])?;
            }
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush().map_err(io_err)?;
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            out.write_all(b"\n").map_err(io_err)?;
        }
    }

    out.flush().map_err(io_err)?;
    out.get_ref().sync_all().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{Enrichment, ReferenceLink};

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let now = "2026-01-01T00:00:00Z";
        let plain = PaperRecord::new(
            "Paper A",
            ReferenceLink::parse("https://ex.org/a").unwrap(),
            "abs, with comma",
        );
        let enriched = PaperRecord::new("论文 B", ReferenceLink::parse("https://ex.org/b").unwrap(), "")
            .with_enrichment(Enrichment {
                summary: "摘要".to_string(),
                highlights: vec!["h1".to_string(), "h2".to_string()],
                applications: vec!["robotics".to_string()],
            });
        paper_repo::upsert(&db, &plain, now).unwrap();
        paper_repo::upsert(&db, &enriched, now).unwrap();
        db
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scholar_results.csv");

        let written = export_snapshot(&seeded_db(), &path, ExportFormat::Csv).unwrap();
        assert_eq!(written, 2);

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("title,link,abstract,summary,highlights,applications")
        );
        assert_eq!(lines.next(), Some("Paper A,https://ex.org/a,\"abs, with comma\",,,"));
        assert_eq!(
            lines.next(),
            Some("论文 B,https://ex.org/b,,摘要,\"h1, h2\",robotics")
        );
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_empty_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let db = Database::open_in_memory().unwrap();

        assert_eq!(export_snapshot(&db, &path, ExportFormat::Csv).unwrap(), 0);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_start_matches('\u{feff}').trim_end(),
            "title,link,abstract,summary,highlights,applications"
        );
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        export_snapshot(&seeded_db(), &path, ExportFormat::Json).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["abstract"], "abs, with comma");
        assert_eq!(rows[0]["summary"], "");
        assert_eq!(rows[1]["highlights"], "h1, h2");
    }

    #[test]
    fn test_export_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.csv");
        fs::write(&path, "stale").unwrap();

        export_snapshot(&seeded_db(), &path, ExportFormat::Csv).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("stale"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/x/papers.csv")),
            PathBuf::from("/tmp/x/papers.csv.partial")
        );
    }
}
