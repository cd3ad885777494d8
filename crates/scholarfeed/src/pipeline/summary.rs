use std::fmt;

use serde::Serialize;

/// Coordinator state. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Fetching,
    ProcessingBatch,
    Committing,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::ProcessingBatch => "processing_batch",
            Self::Committing => "committing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    /// Message ids returned by the listing.
    pub messages_seen: usize,
    pub messages_already_processed: usize,
    pub messages_newly_processed: usize,
    /// Papers whose link had never been stored before.
    pub papers_stored: usize,
    /// Distinct (message, paper) pairs written this run.
    pub papers_linked: usize,
    pub papers_annotated: usize,
    pub extraction_failures: usize,
    pub enrichment_failures: usize,
    pub batches_committed: usize,
    /// The run stopped early at a batch boundary on request.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  messages seen:               {}", self.messages_seen)?;
        writeln!(f, "  messages already processed:  {}", self.messages_already_processed)?;
        writeln!(f, "  messages newly processed:    {}", self.messages_newly_processed)?;
        writeln!(f, "  papers newly stored:         {}", self.papers_stored)?;
        writeln!(f, "  papers linked:               {}", self.papers_linked)?;
        writeln!(f, "  papers annotated:            {}", self.papers_annotated)?;
        writeln!(f, "  extraction failures:         {}", self.extraction_failures)?;
        writeln!(f, "  enrichment failures:         {}", self.enrichment_failures)?;
        write!(f, "  batches committed:           {}", self.batches_committed)?;
        if self.interrupted {
            write!(f, "\n  (interrupted before the listing was exhausted)")?;
        }
        Ok(())
    }
}
