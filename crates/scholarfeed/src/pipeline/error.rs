use thiserror::Error;

use crate::db::DatabaseError;
use crate::mail::MailError;

/// Failures that abort a run. Extraction and annotation problems are
/// recovered inside the coordinator and only show up in the summary.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetching messages failed: {0}")]
    Fetch(#[from] MailError),

    #[error("Store operation failed: {0}")]
    Store(#[from] DatabaseError),
}
