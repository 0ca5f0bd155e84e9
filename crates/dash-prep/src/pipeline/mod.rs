//! Pipeline module.
//!
//! This module provides the analysis and processing entry points and their
//! per-file execution, progress reporting and cancellation.

mod builder;
mod executor;
pub mod progress;

pub use builder::{DataProcessor, DataProcessorBuilder};
pub use executor::FileExecutor;
pub use progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
