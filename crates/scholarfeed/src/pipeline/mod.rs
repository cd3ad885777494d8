pub mod config;
pub mod coordinator;
pub mod error;
pub mod summary;

pub use config::PipelineConfig;
pub use coordinator::BatchCoordinator;
pub use error::PipelineError;
pub use summary::{RunState, RunSummary};
