pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod export;
pub mod extract;
pub mod mail;
pub mod paper;
pub mod pipeline;
pub mod secrets;
pub mod store;

pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use enrich::{AnnotationError, Annotator, EnrichOutcome, Enricher, ThrottledAnnotator};
pub use error::{ConfigError, Result, ScholarfeedError};
pub use export::{export_snapshot, ExportError, ExportFormat};
pub use extract::{Citations, ExtractionError, Extractor};
pub use mail::{ImapMailSource, MailError, MailSource, Message, MessageId};
pub use paper::{Enrichment, PaperId, PaperRecord, ReferenceLink};
pub use pipeline::{BatchCoordinator, PipelineConfig, PipelineError, RunState, RunSummary};
pub use secrets::{SecretError, SecretSource};
pub use store::{SqliteStore, Store, UpsertOutcome};
