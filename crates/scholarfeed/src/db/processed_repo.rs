//! Processed-message ledger: operations on the `processed_messages` table.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Records a message as processed. Re-inserting an existing id is a no-op.
pub fn insert(db: &Database, message_id: &str, processed_at: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO processed_messages (message_id, processed_at) VALUES (?1, ?2)",
            params![message_id, processed_at],
        )?;
        Ok(())
    })
}

/// Checks whether a message id is in the ledger.
pub fn exists(db: &Database, message_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT 1 FROM processed_messages WHERE message_id = ?1",
                params![message_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    })
}

/// Counts all processed messages.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM processed_messages", [], |r| r.get(0))?;
        Ok(count)
    })
}

/// Timestamp (RFC 3339) of the most recently processed message.
pub fn last_processed_at(db: &Database) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let last = conn
            .query_row(
                "SELECT processed_at FROM processed_messages ORDER BY processed_at DESC LIMIT 1",
                [],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(last)
    })
}
