//! Custom error types for the ingestion and processing pipeline.
//!
//! This module provides a comprehensive error hierarchy using `thiserror`
//! for better error handling and context throughout the pipeline.
//!
//! Errors are serializable so that per-file failures can be reported to a
//! frontend or recorded inside an [`AnalysisResult`](crate::types::AnalysisResult).

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The file extension is not on the allow-list or has no reader.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The input file does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input file is larger than the configured ceiling.
    #[error("File too large: {size} bytes (max: {max})")]
    SizeExceeded { size: u64, max: u64 },

    /// The file content could not be parsed.
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    /// The file parsed but yielded no usable table.
    #[error("Empty or unreadable file: {0}")]
    EmptyOrUnreadable(String),

    /// Work was cancelled through a cancellation token.
    #[error("Processing cancelled")]
    Cancelled,

    /// The global deadline passed before the work completed.
    #[error("Processing timed out")]
    TimedOut,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (e.g., worker thread failure).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::SizeExceeded { .. } => "SIZE_EXCEEDED",
            Self::MalformedContent(_) => "MALFORMED_CONTENT",
            Self::EmptyOrUnreadable(_) => "EMPTY_OR_UNREADABLE",
            Self::Cancelled => "CANCELLED",
            Self::TimedOut => "TIMED_OUT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation or a timeout.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Cancelled | Self::TimedOut => true,
            Self::WithContext { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }

    /// Map a polars error raised while parsing file content.
    ///
    /// Polars reports an empty input as `NoData`; everything else is a
    /// parse failure.
    pub(crate) fn from_parse(err: polars::error::PolarsError) -> Self {
        match err {
            polars::error::PolarsError::NoData(msg) => Self::EmptyOrUnreadable(msg.to_string()),
            other => Self::MalformedContent(other.to_string()),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

impl From<crate::config::ConfigValidationError> for ProcessingError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
