use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::paper::Enrichment;

use super::{AnnotationError, Annotator};

/// Enforces a minimum interval between the starts of consecutive calls to
/// the wrapped annotator. Calls are serialized.
pub struct ThrottledAnnotator<A> {
    inner: A,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<A: Annotator> ThrottledAnnotator<A> {
    pub fn new(inner: A, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<A: Annotator> Annotator for ThrottledAnnotator<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn annotate(&self, title: &str, abstract_text: &str) -> Result<Enrichment, AnnotationError> {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                log::trace!("Throttling annotation call until interval elapses");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());

        self.inner.annotate(title, abstract_text).await
    }
}
