//! In-memory stand-ins for the pipeline's external seams.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scholarfeed::enrich::AnnotationError;
use scholarfeed::mail::Result as MailResult;
use scholarfeed::store::StoreError;
use scholarfeed::{
    Annotator, Database, DatabaseError, Enrichment, MailError, MailSource, Message, MessageId,
    PaperId, PaperRecord, ReferenceLink, SqliteStore, Store, UpsertOutcome,
};

/// Mail source over a fixed list of messages, oldest first.
#[derive(Clone, Default)]
pub struct FakeMailSource {
    messages: Vec<Message>,
    /// Ids passed to each `fetch_batch` call.
    pub fetch_calls: Vec<Vec<MessageId>>,
    /// Zero-based index of the `fetch_batch` call that fails.
    pub fail_fetch_call: Option<usize>,
    pub listed_folders: Vec<String>,
    pub closed: bool,
}

impl FakeMailSource {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn failing_on_fetch(mut self, call: usize) -> Self {
        self.fail_fetch_call = Some(call);
        self
    }

    pub fn fetched_ids(&self) -> Vec<MessageId> {
        self.fetch_calls.iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl MailSource for FakeMailSource {
    async fn list_new(&mut self, folder: &str, max_count: usize) -> MailResult<Vec<MessageId>> {
        self.listed_folders.push(folder.to_string());
        let skip = self.messages.len().saturating_sub(max_count);
        Ok(self.messages[skip..].iter().map(|m| m.id.clone()).collect())
    }

    async fn fetch_batch(&mut self, ids: &[MessageId]) -> MailResult<Vec<Message>> {
        let call = self.fetch_calls.len();
        self.fetch_calls.push(ids.to_vec());
        if self.fail_fetch_call == Some(call) {
            return Err(MailError::ConnectionFailed("connection reset by peer".to_string()));
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.messages.iter().find(|m| &m.id == id).cloned())
            .collect())
    }

    async fn close(&mut self) -> MailResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Annotator that derives a deterministic annotation from the title.
///
/// Titles listed in `failing_titles` get a timeout instead.
#[derive(Default)]
pub struct FakeAnnotator {
    calls: AtomicUsize,
    failing_titles: HashSet<String>,
    seen_titles: Mutex<Vec<String>>,
}

impl FakeAnnotator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_titles(&self) -> Vec<String> {
        self.seen_titles.lock().unwrap().clone()
    }

    pub fn annotation_for(title: &str) -> Enrichment {
        Enrichment {
            summary: format!("summary of {}", title),
            highlights: vec![format!("{} highlight", title)],
            applications: vec!["testing".to_string()],
        }
    }
}

#[async_trait]
impl Annotator for FakeAnnotator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn annotate(&self, title: &str, _abstract_text: &str) -> Result<Enrichment, AnnotationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_titles.lock().unwrap().push(title.to_string());
        if self.failing_titles.contains(title) {
            return Err(AnnotationError::Timeout);
        }
        Ok(Self::annotation_for(title))
    }
}

/// Store that fails once a given number of writes has gone through.
///
/// Writes are `mark_processed`, `upsert_paper` and `link`. `commit` can be
/// made to fail separately.
pub struct FlakyStore {
    inner: SqliteStore,
    writes: usize,
    fail_at_write: Option<usize>,
    fail_commit: Option<usize>,
    commits: usize,
}

impl FlakyStore {
    pub fn new(db: Database) -> Self {
        Self {
            inner: SqliteStore::new(db),
            writes: 0,
            fail_at_write: None,
            fail_commit: None,
            commits: 0,
        }
    }

    /// Fails the write with this zero-based index.
    pub fn failing_at_write(mut self, index: usize) -> Self {
        self.fail_at_write = Some(index);
        self
    }

    /// Fails the commit with this zero-based index.
    pub fn failing_at_commit(mut self, index: usize) -> Self {
        self.fail_commit = Some(index);
        self
    }

    fn count_write(&mut self) -> Result<(), StoreError> {
        let index = self.writes;
        self.writes += 1;
        if self.fail_at_write == Some(index) {
            return Err(DatabaseError::LockPoisoned);
        }
        Ok(())
    }
}

impl Store for FlakyStore {
    fn has_processed(&self, message_id: &MessageId) -> Result<bool, StoreError> {
        self.inner.has_processed(message_id)
    }

    fn mark_processed(&mut self, message_id: &MessageId) -> Result<(), StoreError> {
        self.count_write()?;
        self.inner.mark_processed(message_id)
    }

    fn upsert_paper(&mut self, record: &PaperRecord) -> Result<UpsertOutcome, StoreError> {
        self.count_write()?;
        self.inner.upsert_paper(record)
    }

    fn link(&mut self, message_id: &MessageId, paper_id: PaperId) -> Result<(), StoreError> {
        self.count_write()?;
        self.inner.link(message_id, paper_id)
    }

    fn is_enriched(&self, link: &ReferenceLink) -> Result<bool, StoreError> {
        self.inner.is_enriched(link)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let index = self.commits;
        self.commits += 1;
        if self.fail_commit == Some(index) {
            return Err(DatabaseError::LockPoisoned);
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}
