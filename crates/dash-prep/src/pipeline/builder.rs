//! Main processor module.
//!
//! This module provides the [`DataProcessor`] struct and builder for the
//! two entry points: the analysis pass over freshly uploaded files and the
//! processing pass that produces export-ready tables.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::config::{ConfigValidationError, ProcessorConfig};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::export::RelationshipDetector;
use crate::pipeline::executor::{FileExecutor, display_name};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::ColumnNameNormalizer;
use crate::types::{AnalysisResult, DashboardPlan, FileAnalysis, ProcessingResult};
use crate::unifier::{SchemaUnifier, file_stem};

/// Entry point for analyzing and processing uploaded files.
///
/// Use [`DataProcessor::builder()`] to create one with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use dash_prep::{DataProcessor, DashboardPlan, ProcessorConfig};
///
/// let processor = DataProcessor::builder()
///     .config(ProcessorConfig::builder().max_file_size(10 * 1024 * 1024).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
///
/// let analysis = processor.analyze(&["sales.csv", "customers.xlsx"]);
/// println!("{}", analysis.summary);
///
/// let plan: DashboardPlan = serde_json::from_str(plan_json)?;
/// let result = processor.process(&["sales.csv", "customers.xlsx"], &plan)?;
/// ```
pub struct DataProcessor {
    config: ProcessorConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(DataProcessor: Send, Sync);

impl DataProcessor {
    /// Create a new processor builder.
    pub fn builder() -> DataProcessorBuilder {
        DataProcessorBuilder::default()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Analyze every file and merge the results.
    ///
    /// Never fails: a file that cannot be read, or that is interrupted by
    /// cancellation or the deadline, becomes a failed entry in
    /// [`AnalysisResult::files`] and the rest of the batch is still merged.
    pub fn analyze<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> AnalysisResult {
        info!("Analyzing {} files", paths.len());
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            format!("Analyzing {} files...", paths.len()),
        ));

        let executor = FileExecutor::new(&self.config, &self.cancellation_token, self.deadline());
        let done = AtomicUsize::new(0);

        let analyze_one = |path: &Path| {
            let outcome = executor.analyze_file(path);
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            let name = display_name(path);

            match outcome {
                Ok(analysis) => {
                    self.report_progress(ProgressUpdate::for_file(
                        PipelineStage::Analyzing,
                        &name,
                        finished,
                        paths.len(),
                        format!("Analyzed {}", name),
                    ));
                    analysis
                }
                Err(e) => {
                    warn!("Analysis of {} failed: {}", path.display(), e);
                    self.report_progress(ProgressUpdate::for_file(
                        PipelineStage::Analyzing,
                        &name,
                        finished,
                        paths.len(),
                        format!("Failed to analyze {}: {}", name, e),
                    ));
                    FileAnalysis::failed(name, &e)
                }
            }
        };
        let files: Vec<FileAnalysis> = self.scatter(paths, analyze_one, |path| {
            FileAnalysis::failed(display_name(path), &worker_panicked(path))
        });

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Aggregating,
            0.0,
            "Merging schemas...",
        ));
        let result = SchemaUnifier::unify(files);

        if self.cancellation_token.is_cancelled() {
            self.report_progress(ProgressUpdate::cancelled());
        } else {
            self.report_progress(ProgressUpdate::complete(result.summary.clone()));
        }
        result
    }

    /// Clean and export every file, then detect relationships.
    ///
    /// Table names are file stems, suffixed `_2`, `_3`, ... on collision.
    ///
    /// # Errors
    ///
    /// The first failing file (in input order) aborts the call, including
    /// `Cancelled` and `TimedOut` interruptions.
    pub fn process<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        plan: &DashboardPlan,
    ) -> Result<ProcessingResult> {
        match self.process_internal(paths, plan) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(result.summary.clone()));
                Ok(result)
            }
            Err(e) => {
                if e.is_interrupted() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Processing error: {}", e);
                Err(e)
            }
        }
    }

    fn process_internal<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        plan: &DashboardPlan,
    ) -> Result<ProcessingResult> {
        info!(
            "Processing {} files with {} KPIs",
            paths.len(),
            plan.kpis.len()
        );
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            format!("Processing {} files...", paths.len()),
        ));

        let names = table_names(paths);
        let executor = FileExecutor::new(&self.config, &self.cancellation_token, self.deadline());
        let done = AtomicUsize::new(0);

        let process_one = |index: usize, path: &Path| {
            let outcome = executor
                .process_file(path, &names[index], plan)
                .context(format!("Failed to process {}", display_name(path)));
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            self.report_progress(ProgressUpdate::for_file(
                PipelineStage::Processing,
                display_name(path),
                finished,
                paths.len(),
                format!("Processed {}", names[index]),
            ));
            outcome
        };
        let outcomes =
            self.scatter_indexed(paths, process_one, |path| Err(worker_panicked(path)));

        let mut tables = IndexMap::with_capacity(outcomes.len());
        for (name, outcome) in names.into_iter().zip(outcomes) {
            tables.insert(name, outcome?);
        }

        self.report_progress(ProgressUpdate::new(
            PipelineStage::RelationshipDetection,
            0.0,
            "Detecting relationships...",
        ));
        let relationships = if tables.len() > 1 {
            RelationshipDetector::detect(&tables, &self.config.relationship_keywords)
        } else {
            Vec::new()
        };

        let total_rows = tables.values().map(|t| t.row_count).sum();
        let summary = format!("Processed {} tables", tables.len());
        info!(
            "{}: {} rows, {} relationships",
            summary,
            total_rows,
            relationships.len()
        );

        Ok(ProcessingResult {
            tables,
            relationships,
            total_rows,
            summary,
        })
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.config
            .timeout()
            .and_then(|timeout| Instant::now().checked_add(timeout))
    }

    /// Run `task` for every path on a bounded set of scoped threads and gather the
    /// results in input order. A worker that panics yields `on_panic(path)`.
    fn scatter<P, T, F, G>(&self, paths: &[P], task: F, on_panic: G) -> Vec<T>
    where
        P: AsRef<Path> + Sync,
        T: Send,
        F: Fn(&Path) -> T + Sync,
        G: Fn(&Path) -> T,
    {
        self.scatter_indexed(paths, |_, path| task(path), on_panic)
    }

    fn scatter_indexed<P, T, F, G>(&self, paths: &[P], task: F, on_panic: G) -> Vec<T>
    where
        P: AsRef<Path> + Sync,
        T: Send,
        F: Fn(usize, &Path) -> T + Sync,
        G: Fn(&Path) -> T,
    {
        let workers = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        scatter_chunked(paths, workers, task, on_panic)
    }
}

/// Run `task` over `paths` on at most `workers` scoped threads at a time,
/// gathering the results in input order.
fn scatter_chunked<P, T, F, G>(paths: &[P], workers: usize, task: F, on_panic: G) -> Vec<T>
where
    P: AsRef<Path> + Sync,
    T: Send,
    F: Fn(usize, &Path) -> T + Sync,
    G: Fn(&Path) -> T,
{
    let workers = workers.max(1);
    let task = &task;
    let mut results = Vec::with_capacity(paths.len());

    for (chunk_index, chunk) in paths.chunks(workers).enumerate() {
        let offset = chunk_index * workers;
        std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .enumerate()
                .map(|(i, path)| scope.spawn(move || task(offset + i, path.as_ref())))
                .collect();

            for (handle, path) in handles.into_iter().zip(chunk) {
                results.push(handle.join().unwrap_or_else(|_| {
                    error!("Worker for {} panicked", path.as_ref().display());
                    on_panic(path.as_ref())
                }));
            }
        });
    }
    results
}

fn worker_panicked(path: &Path) -> ProcessingError {
    ProcessingError::Internal(format!("worker for {} panicked", display_name(path)))
}

/// File stems disambiguated with `_2`, `_3`, ... in input order.
fn table_names<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(paths.len());
    paths
        .iter()
        .map(|path| {
            let stem = file_stem(&display_name(path.as_ref()));
            let name = ColumnNameNormalizer::disambiguate(&stem, &taken);
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Builder for creating a [`DataProcessor`] instance.
///
/// Use [`DataProcessor::builder()`] to get started.
#[derive(Default)]
pub struct DataProcessorBuilder {
    config: Option<ProcessorConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(DataProcessorBuilder: Send);

impl DataProcessorBuilder {
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving per-file updates.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// The callback is invoked from worker threads.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping a run from another thread.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the processor.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<DataProcessor, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(DataProcessor {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
