//! Per-file executor.
//!
//! Runs the stages for a single input file: read, profile and sample for
//! the analysis pass; read, profile, clean, derive and export for the
//! processing pass. Cancellation and the deadline are checked between
//! stages.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::cleaner::{DataCleaner, DerivedColumns};
use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};
use crate::export::TableExporter;
use crate::pipeline::progress::CancellationToken;
use crate::profiler::DataProfiler;
use crate::reader::{self, extension_of};
use crate::types::{DashboardPlan, FileAnalysis, FileStatus, ProcessedTable};

/// Executes the per-file stages of one run.
pub struct FileExecutor<'a> {
    config: &'a ProcessorConfig,
    cancellation_token: &'a CancellationToken,
    deadline: Option<Instant>,
}

impl<'a> FileExecutor<'a> {
    pub fn new(
        config: &'a ProcessorConfig,
        cancellation_token: &'a CancellationToken,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            config,
            cancellation_token,
            deadline,
        }
    }

    /// Fail with `Cancelled` or `TimedOut` when the run was interrupted.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ProcessingError::TimedOut);
        }
        Ok(())
    }

    /// Read and profile one file for the analysis pass.
    pub fn analyze_file(&self, path: &Path) -> Result<FileAnalysis> {
        self.checkpoint()?;
        let raw = reader::read_file(path, self.config)?;

        self.checkpoint()?;
        let profiled = DataProfiler::profile_table(&raw, self.config)?;
        let sample_rows = DataProfiler::sample_rows(&profiled.frame, self.config.sample_row_limit);

        self.checkpoint()?;
        info!(
            "Analyzed {}: {} rows, {} columns",
            path.display(),
            raw.row_count(),
            profiled.schema.len()
        );

        Ok(FileAnalysis {
            filename: display_name(path),
            status: FileStatus::Success,
            file_type: Some(extension_of(path)),
            row_count: raw.row_count(),
            columns: profiled.schema.names(),
            original_columns: profiled.schema.raw_names(),
            schema: profiled.schema,
            sample_rows,
            metadata: Some(raw.metadata().clone()),
            error: None,
            error_code: None,
        })
    }

    /// Read, clean and export one file for the processing pass.
    pub fn process_file(
        &self,
        path: &Path,
        table_name: &str,
        plan: &DashboardPlan,
    ) -> Result<ProcessedTable> {
        self.checkpoint()?;
        let raw = reader::read_file(path, self.config)?;

        self.checkpoint()?;
        let profiled = DataProfiler::profile_table(&raw, self.config)?;

        self.checkpoint()?;
        let mut cleaned = DataCleaner::clean(&profiled, raw.is_unstructured(), self.config)?;
        DerivedColumns::apply(&mut cleaned, plan, self.config)?;
        debug!(
            "{}: {} cleaning steps",
            table_name,
            cleaned.steps.len()
        );

        self.checkpoint()?;
        let table = TableExporter::export(table_name, &cleaned);
        info!(
            "Processed {} as '{}': {} rows, {} columns",
            path.display(),
            table_name,
            table.row_count,
            table.column_count
        );
        Ok(table)
    }
}

/// File name shown in results, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
