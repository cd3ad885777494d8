use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::enrich::{EnrichOutcome, Enricher};
use crate::extract::{Citations, Extractor};
use crate::mail::{MailSource, Message, MessageId};
use crate::store::Store;

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::summary::{RunState, RunSummary};

/// Drives one ingestion run: list, fetch in batches, extract, enrich, store,
/// commit per batch.
///
/// Everything runs sequentially. Progress becomes durable only at batch
/// commits, and every store write is idempotent, so a run that dies
/// mid-batch can simply be repeated.
pub struct BatchCoordinator<M, S> {
    config: PipelineConfig,
    source: M,
    store: S,
    enricher: Enricher,
    extractor: Extractor,
    state: RunState,
    summary: RunSummary,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<M: MailSource, S: Store> BatchCoordinator<M, S> {
    pub fn new(config: PipelineConfig, source: M, store: S, enricher: Enricher) -> Self {
        Self {
            config,
            source,
            store,
            enricher,
            extractor: Extractor::new(),
            state: RunState::Fetching,
            summary: RunSummary::default(),
            shutdown: None,
        }
    }

    /// Stops the run at the next batch boundary once `flag` is set.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Counters of the last run, including a failed one.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &M {
        &self.source
    }

    pub fn into_parts(self) -> (M, S) {
        (self.source, self.store)
    }

    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        self.summary = RunSummary::new(run_id.clone());
        self.state = RunState::Fetching;

        let span = info_span!(
            "ingest",
            run_id = %run_id,
            folder = %self.config.folder,
            max_messages = self.config.max_messages,
            batch_size = self.config.effective_batch_size(),
        );

        let result = self.run_batches().instrument(span).await;

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Closing the mail source failed");
        }

        match result {
            Ok(()) => {
                self.state = RunState::Done;
                info!(
                    run_id = %run_id,
                    newly_processed = self.summary.messages_newly_processed,
                    papers_stored = self.summary.papers_stored,
                    "Run finished"
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                self.state = RunState::Failed;
                warn!(run_id = %run_id, error = %e, "Run failed");
                Err(e)
            }
        }
    }

    async fn run_batches(&mut self) -> Result<(), PipelineError> {
        self.state = RunState::Fetching;
        let pending = self.list_pending().await?;
        info!(
            seen = self.summary.messages_seen,
            already_processed = self.summary.messages_already_processed,
            pending = pending.len(),
            "Listed messages"
        );

        for (index, batch) in pending.chunks(self.config.effective_batch_size()).enumerate() {
            if self.shutdown_requested() {
                info!("Shutdown requested, stopping at batch boundary");
                self.summary.interrupted = true;
                break;
            }

            // Counters only reflect committed batches.
            let committed = self.summary.clone();
            let span = info_span!("batch", index, size = batch.len());
            let outcome = self.run_batch(batch).instrument(span).await;
            if let Err(e) = outcome {
                self.summary = committed;
                if let Err(rollback_err) = self.store.rollback() {
                    warn!(error = %rollback_err, "Rolling back the failed batch also failed");
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Newest `max_messages` identifiers that are not in the ledger yet,
    /// oldest first.
    ///
    /// The listing window grows by the number of already processed ids it
    /// contained, so processed messages never use up the limit and an older
    /// backlog drains over later runs.
    async fn list_pending(&mut self) -> Result<Vec<MessageId>, PipelineError> {
        let folder = self.config.folder.clone();
        let limit = self.config.max_messages;
        let mut window = limit;

        loop {
            let ids = self.source.list_new(&folder, window).await?;
            let mut pending = Vec::with_capacity(ids.len());
            for id in &ids {
                if !self.store.has_processed(id)? {
                    pending.push(id.clone());
                }
            }

            let processed = ids.len() - pending.len();
            let exhausted = ids.len() < window;
            let next_window = limit.saturating_add(processed);
            if pending.len() >= limit || exhausted || next_window <= window {
                let skip = pending.len().saturating_sub(limit);
                pending.drain(..skip);
                self.summary.messages_seen = ids.len();
                self.summary.messages_already_processed = processed;
                return Ok(pending);
            }

            debug!(window, processed, "Widening listing past processed messages");
            window = next_window;
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    async fn run_batch(&mut self, batch: &[MessageId]) -> Result<(), PipelineError> {
        self.state = RunState::Fetching;
        let messages = self.source.fetch_batch(batch).await?;

        self.state = RunState::ProcessingBatch;
        for message in &messages {
            self.process_message(message).await?;
        }

        self.state = RunState::Committing;
        self.store.commit()?;
        self.summary.batches_committed += 1;
        debug!(processed = messages.len(), "Batch committed");
        Ok(())
    }

    async fn process_message(&mut self, message: &Message) -> Result<(), PipelineError> {
        let citations = match self.extractor.extract(message) {
            Ok(citations) => citations,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Extraction failed, marking message processed");
                self.summary.extraction_failures += 1;
                Citations::empty()
            }
        };

        let mut linked = HashSet::new();
        for candidate in citations {
            let candidate = if self.enricher.is_enabled() && !self.store.is_enriched(&candidate.link)? {
                let (candidate, outcome) = self.enricher.enrich(candidate).await;
                match outcome {
                    EnrichOutcome::Annotated => self.summary.papers_annotated += 1,
                    EnrichOutcome::Failed(_) => self.summary.enrichment_failures += 1,
                    EnrichOutcome::Skipped => {}
                }
                candidate
            } else {
                candidate
            };

            let stored = self.store.upsert_paper(&candidate)?;
            if stored.was_new {
                self.summary.papers_stored += 1;
            }
            self.store.link(&message.id, stored.paper_id)?;
            if linked.insert(stored.paper_id) {
                self.summary.papers_linked += 1;
            }
        }

        self.store.mark_processed(&message.id)?;
        self.summary.messages_newly_processed += 1;
        debug!(message_id = %message.id, papers = linked.len(), "Message processed");
        Ok(())
    }
}
