//! Shared test utilities for scholarfeed integration tests.
//!
//! - fakes for the mail source, the annotator and a store that fails on demand
//! - builders for raw alert messages

pub mod builders;
pub mod fakes;

pub use builders::*;
pub use fakes::*;
