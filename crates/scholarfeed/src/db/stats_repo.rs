//! Aggregate counts over the ledger, papers and links.

use serde::Serialize;

use super::{link_repo, paper_repo, processed_repo, Database, DatabaseError};

/// Point-in-time counts of persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub processed_messages: u64,
    pub papers: u64,
    pub enriched_papers: u64,
    pub links: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<String>,
}

/// Collects all counts.
pub fn snapshot(db: &Database) -> Result<StoreStats, DatabaseError> {
    Ok(StoreStats {
        processed_messages: processed_repo::count(db)?,
        papers: paper_repo::count(db)?,
        enriched_papers: paper_repo::count_enriched(db)?,
        links: link_repo::count(db)?,
        last_processed_at: processed_repo::last_processed_at(db)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{Enrichment, PaperRecord, ReferenceLink};

    #[test]
    fn test_snapshot_of_empty_db() {
        let db = Database::open_in_memory().unwrap();
        let stats = snapshot(&db).unwrap();
        assert_eq!(
            stats,
            StoreStats {
                processed_messages: 0,
                papers: 0,
                enriched_papers: 0,
                links: 0,
                last_processed_at: None,
            }
        );
    }

    #[test]
    fn test_snapshot_counts() {
        let db = Database::open_in_memory().unwrap();
        let now = "2026-01-01T00:00:00Z";
        let plain = PaperRecord::new("A", ReferenceLink::parse("https://ex.org/a").unwrap(), "");
        let enriched = PaperRecord::new("B", ReferenceLink::parse("https://ex.org/b").unwrap(), "")
            .with_enrichment(Enrichment {
                summary: "S".to_string(),
                ..Default::default()
            });
        let a = paper_repo::upsert(&db, &plain, now).unwrap().paper_id;
        let b = paper_repo::upsert(&db, &enriched, now).unwrap().paper_id;
        link_repo::insert(&db, "INBOX:1:1", a, now).unwrap();
        link_repo::insert(&db, "INBOX:1:1", b, now).unwrap();
        processed_repo::insert(&db, "INBOX:1:1", now).unwrap();

        let stats = snapshot(&db).unwrap();
        assert_eq!(stats.processed_messages, 1);
        assert_eq!(stats.papers, 2);
        assert_eq!(stats.enriched_papers, 1);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.last_processed_at.as_deref(), Some(now));
    }
}
