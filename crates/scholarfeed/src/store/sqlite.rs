use chrono::Utc;
use log::{debug, warn};

use crate::db::{link_repo, paper_repo, processed_repo, Database, DatabaseError};
use crate::mail::MessageId;
use crate::paper::{PaperId, PaperRecord, ReferenceLink};

use super::{Store, UpsertOutcome};

/// [`Store`] backed by the scholarfeed SQLite database.
///
/// The first write after a commit opens a transaction on the shared
/// connection; `commit` closes it. Anything uncommitted when the process dies
/// (or when the store is dropped) is rolled back by SQLite.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// True while a batch transaction is open.
    pub fn in_batch(&self) -> Result<bool, DatabaseError> {
        self.db.with_conn(|conn| Ok(!conn.is_autocommit()))
    }

    fn begin_batch(&self) -> Result<(), DatabaseError> {
        self.db.with_conn(|conn| {
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN IMMEDIATE")?;
                debug!("Opened batch transaction");
            }
            Ok(())
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl Store for SqliteStore {
    fn has_processed(&self, message_id: &MessageId) -> Result<bool, DatabaseError> {
        processed_repo::exists(&self.db, message_id.as_str())
    }

    fn mark_processed(&mut self, message_id: &MessageId) -> Result<(), DatabaseError> {
        self.begin_batch()?;
        processed_repo::insert(&self.db, message_id.as_str(), &now())
    }

    fn upsert_paper(&mut self, record: &PaperRecord) -> Result<UpsertOutcome, DatabaseError> {
        self.begin_batch()?;
        paper_repo::upsert(&self.db, record, &now())
    }

    fn link(&mut self, message_id: &MessageId, paper_id: PaperId) -> Result<(), DatabaseError> {
        self.begin_batch()?;
        link_repo::insert(&self.db, message_id.as_str(), paper_id, &now())
    }

    fn is_enriched(&self, link: &ReferenceLink) -> Result<bool, DatabaseError> {
        paper_repo::is_enriched(&self.db, link)
    }

    fn commit(&mut self) -> Result<(), DatabaseError> {
        self.db.with_conn(|conn| {
            if !conn.is_autocommit() {
                conn.execute_batch("COMMIT")?;
                debug!("Committed batch transaction");
            }
            Ok(())
        })
    }

    fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.db.with_conn(|conn| {
            if !conn.is_autocommit() {
                conn.execute_batch("ROLLBACK")?;
                warn!("Rolled back uncommitted batch");
            }
            Ok(())
        })
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if matches!(self.in_batch(), Ok(true)) {
            warn!("SqliteStore dropped with an open batch - discarding uncommitted writes");
            if let Err(e) = self.rollback() {
                warn!("Failed to roll back open batch: {}", e);
            }
        }
    }
}
