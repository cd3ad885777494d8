use crate::config::Config;

/// Run parameters threaded into the [`BatchCoordinator`](super::BatchCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub folder: String,
    pub max_messages: usize,
    pub batch_size: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            folder: config.mail.folder.clone(),
            max_messages: config.ingest.max_messages,
            batch_size: config.ingest.batch_size,
        }
    }

    /// Batch size as used by the coordinator; never zero.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
