mod common;

use std::sync::Arc;

use common::{text_alert, FakeAnnotator, FakeMailSource};
use scholarfeed::{
    export_snapshot, BatchCoordinator, Database, Enricher, ExportFormat, PipelineConfig,
    SqliteStore,
};
use tempfile::TempDir;

async fn ingest(db: &Database, annotator: &Arc<FakeAnnotator>) {
    let messages = vec![
        text_alert(
            "INBOX:1:1",
            &[
                ("Paper A", "https://ex.org/a", "abs A"),
                ("Paper B", "https://ex.org/b", "abs, with \"quotes\""),
            ],
        ),
        text_alert("INBOX:1:2", &[("Paper A", "https://ex.org/a", "abs A")]),
    ];

    let mut coordinator = BatchCoordinator::new(
        PipelineConfig {
            folder: "INBOX".to_string(),
            max_messages: 10,
            batch_size: 5,
        },
        FakeMailSource::new(messages),
        SqliteStore::new(db.clone()),
        Enricher::new(Box::new(Arc::clone(annotator))),
    );
    coordinator.run().await.unwrap();
}

#[tokio::test]
async fn test_csv_snapshot_after_ingest() {
    let db = Database::open_in_memory().unwrap();
    ingest(&db, &FakeAnnotator::failing_for(&["Paper B"])).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("papers.csv");
    let written = export_snapshot(&db, &path, ExportFormat::Csv).unwrap();
    assert_eq!(written, 2);

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

    let mut reader = csv::Reader::from_reader(&bytes[3..]);
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    assert_eq!(
        headers,
        vec!["title", "link", "abstract", "summary", "highlights", "applications"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Paper A");
    assert_eq!(&rows[0][3], "summary of Paper A");
    assert_eq!(&rows[0][4], "Paper A highlight");
    assert_eq!(&rows[1][2], "abs, with \"quotes\"");
    assert_eq!(&rows[1][3], "");
}

#[tokio::test]
async fn test_json_snapshot_after_ingest() {
    let db = Database::open_in_memory().unwrap();
    ingest(&db, &FakeAnnotator::new()).await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("papers.json");
    export_snapshot(&db, &path, ExportFormat::Json).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["link"], "https://ex.org/b");
    assert_eq!(rows[1]["summary"], "summary of Paper B");
    assert_eq!(rows[1]["applications"], "testing");
    assert!(!dir.path().join("papers.json.partial").exists());
}
