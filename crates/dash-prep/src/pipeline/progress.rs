//! Progress reporting and cancellation support for the ingestion pipeline.
//!
//! This module provides types for tracking per-file progress and supporting
//! cancellation from external threads (e.g., an upload handler that gave up).
//!
//! # Example
//!
//! ```rust,ignore
//! use dash_prep::{CancellationToken, DataProcessor};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let analysis = DataProcessor::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .analyze(&paths);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of an analysis or processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Validating configuration and inputs
    Initializing,
    /// Reading and profiling files (analysis pass)
    Analyzing,
    /// Reading, cleaning and exporting files (processing pass)
    Processing,
    /// Merging per-file schemas
    Aggregating,
    /// Looking for joins between processed tables
    RelationshipDetection,
    /// Run completed
    Complete,
    /// Run was cancelled
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Analyzing => "Analyzing Files",
            Self::Processing => "Processing Files",
            Self::Aggregating => "Aggregating Schemas",
            Self::RelationshipDetection => "Detecting Relationships",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run taken by this stage.
    ///
    /// A run goes through `Initializing`, one per-file stage and one
    /// finishing stage, so each pass sums to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::Analyzing | Self::Processing => 0.85,
            Self::Aggregating | Self::RelationshipDetection => 0.10,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Analyzing | Self::Processing => 0.05,
            Self::Aggregating | Self::RelationshipDetection => 0.90,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// Progress update, optionally tied to one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// File the update is about, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    /// Files finished so far in the per-file stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_done: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a progress update for a stage.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            file: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            files_done: None,
            files_total: None,
        }
    }

    /// Creates a per-file progress update with file counts.
    pub fn for_file(
        stage: PipelineStage,
        file: impl Into<String>,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            done as f32 / total as f32
        } else {
            0.0
        };
        Self {
            file: Some(file.into()),
            files_done: Some(done),
            files_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self {
            progress: 0.0,
            stage_progress: 0.0,
            ..Self::new(PipelineStage::Cancelled, 0.0, "Run cancelled")
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates.
///
/// Per-file updates are emitted from worker threads, so implementations
/// must be `Send + Sync` and should not block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running analysis or processing call.
///
/// Clones share one atomic flag. Per-file work checks the token between
/// stages; an analysis records interrupted files as failed entries while
/// processing returns [`ProcessingError::Cancelled`](crate::error::ProcessingError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel()`](Self::cancel) has been called on
    /// this token or any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        assert!(!token2.is_cancelled());

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_stage_display_names() {
        assert_eq!(PipelineStage::Analyzing.display_name(), "Analyzing Files");
        assert_eq!(
            PipelineStage::RelationshipDetection.display_name(),
            "Detecting Relationships"
        );
    }

    #[test]
    fn test_progress_update_for_file() {
        let update = ProgressUpdate::for_file(
            PipelineStage::Analyzing,
            "sales.csv",
            1,
            4,
            "Analyzed sales.csv",
        );
        assert_eq!(update.file.as_deref(), Some("sales.csv"));
        assert_eq!(update.stage_progress, 0.25);
        assert_eq!(update.files_done, Some(1));
        assert_eq!(update.files_total, Some(4));
        assert!((update.progress - (0.05 + 0.85 * 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_terminal_states() {
        assert_eq!(ProgressUpdate::complete("Done").progress, 1.0);
        assert_eq!(ProgressUpdate::cancelled().stage, PipelineStage::Cancelled);
        assert_eq!(ProgressUpdate::failed("boom").progress, 0.0);
    }

    #[test]
    fn test_stage_weights_sum_per_pass() {
        for (per_file, finishing) in [
            (PipelineStage::Analyzing, PipelineStage::Aggregating),
            (PipelineStage::Processing, PipelineStage::RelationshipDetection),
        ] {
            let total = PipelineStage::Initializing.weight() + per_file.weight() + finishing.weight();
            assert!((total - 1.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_progress_update_json_serialization() {
        let update = ProgressUpdate::for_file(
            PipelineStage::RelationshipDetection,
            "orders.json",
            2,
            2,
            "done",
        );
        let json = serde_json::to_string(&update).expect("Should serialize");

        assert!(json.contains("\"stage\":\"relationship_detection\""));
        assert!(json.contains("\"file\":\"orders.json\""));
        assert!(json.contains("\"files_total\":2"));

        let plain = serde_json::to_string(&ProgressUpdate::new(PipelineStage::Initializing, 0.0, "x"))
            .expect("Should serialize");
        assert!(!plain.contains("file"));
    }

    #[test]
    fn test_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        std::thread::scope(|scope| {
            for _ in 0..3 {
                let reporter = reporter.clone();
                scope.spawn(move || {
                    reporter.report(ProgressUpdate::new(PipelineStage::Analyzing, 0.5, "worker"));
                });
            }
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }
}
