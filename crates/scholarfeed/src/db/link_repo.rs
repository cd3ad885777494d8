//! Message-to-paper links: the `message_papers` table.

use rusqlite::params;

use crate::paper::PaperId;

use super::{Database, DatabaseError};

/// Links a message to a paper. Linking the same pair twice is a no-op.
pub fn insert(
    db: &Database,
    message_id: &str,
    paper_id: PaperId,
    linked_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO message_papers (message_id, paper_id, linked_at) VALUES (?1, ?2, ?3)",
            params![message_id, paper_id.0, linked_at],
        )?;
        Ok(())
    })
}

/// Message ids that cited a paper, sorted.
pub fn messages_for_paper(db: &Database, paper_id: PaperId) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT message_id FROM message_papers WHERE paper_id = ?1 ORDER BY message_id",
        )?;
        let ids = stmt
            .query_map(params![paper_id.0], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}

/// Counts all links.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM message_papers", [], |r| r.get(0))?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::paper_repo;
    use crate::paper::{PaperRecord, ReferenceLink};

    const NOW: &str = "2026-01-01T00:00:00Z";

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn store_paper(db: &Database, link: &str) -> PaperId {
        let record = PaperRecord::new("T", ReferenceLink::parse(link).unwrap(), "");
        paper_repo::upsert(db, &record, NOW).unwrap().paper_id
    }

    #[test]
    fn test_insert_is_idempotent() {
        let db = test_db();
        let paper = store_paper(&db, "https://ex.org/a");
        insert(&db, "INBOX:1:1", paper, NOW).unwrap();
        insert(&db, "INBOX:1:1", paper, NOW).unwrap();
        assert_eq!(count(&db).unwrap(), 1);
    }

    #[test]
    fn test_many_to_many() {
        let db = test_db();
        let a = store_paper(&db, "https://ex.org/a");
        let b = store_paper(&db, "https://ex.org/b");
        insert(&db, "INBOX:1:1", a, NOW).unwrap();
        insert(&db, "INBOX:1:1", b, NOW).unwrap();
        insert(&db, "INBOX:1:2", a, NOW).unwrap();

        assert_eq!(
            messages_for_paper(&db, a).unwrap(),
            vec!["INBOX:1:1".to_string(), "INBOX:1:2".to_string()]
        );
        assert_eq!(messages_for_paper(&db, b).unwrap(), vec!["INBOX:1:1".to_string()]);
        assert_eq!(count(&db).unwrap(), 3);
    }

    #[test]
    fn test_link_requires_existing_paper() {
        let db = test_db();
        assert!(insert(&db, "INBOX:1:1", PaperId(999), NOW).is_err());
    }
}
