//! Dashboard Data Preparation Library
//!
//! Schema inference, cleaning and export of uploaded tabular files, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! Two passes share the same readers and profiler:
//!
//! - **Analysis**: every file is read, its columns are normalized, typed and
//!   summarized, and the per-file schemas are merged into one
//!   [`AnalysisResult`] with a natural-language summary
//! - **Processing**: every file is cleaned per column type, enriched with
//!   dashboard-plan KPI and calendar columns, and exported as a
//!   [`ProcessedTable`] with JSON-safe rows; probable joins between tables
//!   are reported as [`Relationship`]s
//!
//! Supported inputs: spreadsheets (`.xlsx`, `.xls`), delimited text (`.csv`),
//! JSON records (`.json`) and plain text (`.txt`).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dash_prep::{DashboardPlan, DataProcessor};
//!
//! let processor = DataProcessor::builder().build()?;
//!
//! // Analysis never fails; unreadable files become failed entries
//! let analysis = processor.analyze(&["sales.csv", "customers.xlsx"]);
//! println!("{}", analysis.summary);
//! for file in analysis.failed_files() {
//!     println!("{}: {:?}", file.filename, file.error);
//! }
//!
//! // Processing propagates the first file-level error
//! let plan: DashboardPlan = serde_json::from_str(r#"{
//!     "kpis": [{"name": "Revenue", "field": "Sales", "calculation": "SUM"}]
//! }"#)?;
//! let result = processor.process(&["sales.csv", "customers.xlsx"], &plan)?;
//! for (name, table) in &result.tables {
//!     println!("{}: {} rows", name, table.row_count);
//! }
//! ```
//!
//! # Configuration
//!
//! Use [`ProcessorConfig`] to adjust limits and heuristics:
//!
//! ```rust,ignore
//! use dash_prep::ProcessorConfig;
//! use std::time::Duration;
//!
//! let config = ProcessorConfig::builder()
//!     .max_file_size(20 * 1024 * 1024)
//!     .missing_value_threshold(0.3)
//!     .relationship_keywords(["id", "key", "code", "number", "sku"])
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod reader;
pub mod types;
pub mod unifier;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleanedTable, DataCleaner, DerivedColumns};
pub use config::{ConfigValidationError, ProcessorConfig, ProcessorConfigBuilder};
pub use error::{ProcessingError, Result as DashPrepResult, ResultExt};
pub use export::{RelationshipDetector, TableExporter};
pub use imputers::StatisticalImputer;
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, DataProcessor, DataProcessorBuilder, FileExecutor,
    PipelineStage, ProgressReporter, ProgressUpdate,
};
pub use profiler::{
    ColumnNameNormalizer, DataProfiler, ProfiledTable, StatisticsCalculator, TypeInferencer,
};
pub use reader::{RawTable, SourceFormat, SourceMetadata, read_file};
pub use types::{
    AnalysisResult, Cardinality, ColumnProfile, DashboardPlan, ExportColumn, ExportType,
    FileAnalysis, FileStatus, InferredType, Kpi, KpiCalculation, NumericStats, ProcessedTable,
    ProcessingResult, Relationship, TableSchema, TypeCategory, UnifiedColumn,
};
pub use unifier::SchemaUnifier;
