//! The dedup ledger seen by the ingestion pipeline.
//!
//! Every operation is idempotent so a batch can be replayed after a crash.
//! Writes accumulate in an open batch until [`Store::commit`].

mod sqlite;

pub use crate::db::paper_repo::UpsertOutcome;
pub use sqlite::SqliteStore;

use crate::db::DatabaseError;
use crate::mail::MessageId;
use crate::paper::{PaperId, PaperRecord, ReferenceLink};

/// Store failures are fatal to a run.
pub type StoreError = DatabaseError;

pub trait Store {
    /// Whether the message is already in the ledger. No side effects.
    fn has_processed(&self, message_id: &MessageId) -> Result<bool, StoreError>;

    /// Adds the message to the ledger. Marking twice is a no-op.
    fn mark_processed(&mut self, message_id: &MessageId) -> Result<(), StoreError>;

    /// Inserts the paper or merges missing enrichment into the existing row.
    fn upsert_paper(&mut self, record: &PaperRecord) -> Result<UpsertOutcome, StoreError>;

    /// Associates a message with a paper. Linking twice is a no-op.
    fn link(&mut self, message_id: &MessageId, paper_id: PaperId) -> Result<(), StoreError>;

    /// Whether the stored paper for `link` already carries enrichment.
    fn is_enriched(&self, link: &ReferenceLink) -> Result<bool, StoreError>;

    /// Makes every write since the last commit durable as one unit.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards every write since the last commit.
    fn rollback(&mut self) -> Result<(), StoreError>;
}
