//! Paper enrichment through an external annotation capability.
//!
//! The [`Annotator`] trait is the seam to the summarization API. The
//! [`Enricher`] wraps it with the on/off switch and turns every annotation
//! failure into an outcome instead of an error, so one bad call never
//! affects other candidates.

mod openai;
mod response;
mod throttle;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::config::EnrichmentConfig;
use crate::paper::{Enrichment, PaperRecord};

pub use openai::OpenAiAnnotator;
pub use response::parse_annotation;
pub use throttle::ThrottledAnnotator;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("annotation request failed: {0}")]
    Transport(String),

    #[error("annotation request timed out")]
    Timeout,

    #[error("annotation quota exhausted, retry after {retry_after_secs:?} seconds")]
    Quota { retry_after_secs: Option<u64> },

    #[error("annotation API rejected the credentials: {0}")]
    Authentication(String),

    #[error("annotation API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("invalid annotation response: {0}")]
    InvalidResponse(String),

    #[error("annotation response carried no content")]
    Empty,

    #[error("annotator setup failed: {0}")]
    Setup(String),
}

#[async_trait]
pub trait Annotator: Send + Sync {
    fn name(&self) -> &str;

    async fn annotate(&self, title: &str, abstract_text: &str) -> Result<Enrichment, AnnotationError>;
}

#[async_trait]
impl<A: Annotator + ?Sized> Annotator for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn annotate(&self, title: &str, abstract_text: &str) -> Result<Enrichment, AnnotationError> {
        (**self).annotate(title, abstract_text).await
    }
}

#[async_trait]
impl<A: Annotator + ?Sized> Annotator for Arc<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn annotate(&self, title: &str, abstract_text: &str) -> Result<Enrichment, AnnotationError> {
        (**self).annotate(title, abstract_text).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Enrichment is switched off; the annotator was not called.
    Skipped,
    Annotated,
    Failed(AnnotationError),
}

pub struct Enricher {
    annotator: Option<Box<dyn Annotator>>,
    enabled: bool,
}

impl Enricher {
    pub fn new(annotator: Box<dyn Annotator>) -> Self {
        Self {
            annotator: Some(annotator),
            enabled: true,
        }
    }

    /// An enricher that passes every candidate through untouched.
    pub fn disabled() -> Self {
        Self {
            annotator: None,
            enabled: false,
        }
    }

    /// Builds the configured annotator, wrapped in a throttle when
    /// `min_interval_ms` is set.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, AnnotationError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let annotator = OpenAiAnnotator::from_config(config)?;
        let annotator: Box<dyn Annotator> = if config.min_interval_ms > 0 {
            Box::new(ThrottledAnnotator::new(
                annotator,
                std::time::Duration::from_millis(config.min_interval_ms),
            ))
        } else {
            Box::new(annotator)
        };

        Ok(Self::new(annotator))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.annotator.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Annotates one candidate.
    ///
    /// The candidate is returned unmodified unless the outcome is `Annotated`.
    pub async fn enrich(&self, candidate: PaperRecord) -> (PaperRecord, EnrichOutcome) {
        let annotator = match (&self.annotator, self.enabled) {
            (Some(annotator), true) => annotator,
            _ => return (candidate, EnrichOutcome::Skipped),
        };

        match annotator
            .annotate(&candidate.title, &candidate.abstract_text)
            .await
        {
            Ok(enrichment) if enrichment.is_empty() => {
                warn!("{} returned an empty annotation for {}", annotator.name(), candidate.link);
                (candidate, EnrichOutcome::Failed(AnnotationError::Empty))
            }
            Ok(enrichment) => {
                debug!("Annotated {}", candidate.link);
                (candidate.with_enrichment(enrichment), EnrichOutcome::Annotated)
            }
            Err(e) => {
                warn!("Annotation failed for {}: {}", candidate.link, e);
                (candidate, EnrichOutcome::Failed(e))
            }
        }
    }
}
