//! Configuration types for the ingestion pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic processor setup. Every heuristic constant used
//! by the readers, the profiler, the cleaner and the relationship detector
//! lives here rather than as a literal in the code that uses it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default byte ceiling for a single input file (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Configuration for the [`DataProcessor`](crate::DataProcessor).
///
/// Use [`ProcessorConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use dash_prep::config::ProcessorConfig;
///
/// let config = ProcessorConfig::builder()
///     .max_file_size(10 * 1024 * 1024)
///     .missing_value_threshold(0.4)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Extensions accepted by the readers (lowercase, with leading dot).
    /// Default: .xlsx, .xls, .csv, .json, .txt
    pub allowed_extensions: Vec<String>,

    /// Files larger than this many bytes are rejected before parsing.
    /// Default: 104,857,600 (100 MB)
    pub max_file_size: u64,

    /// Number of rows parsed while probing encodings and delimiters.
    /// Default: 1000
    pub csv_probe_rows: usize,

    /// Number of leading lines sampled when sniffing plain-text files.
    /// Default: 5
    pub text_probe_lines: usize,

    /// Number of non-null values examined by the datetime and numeric rules.
    /// Default: 100
    pub inference_sample_size: usize,

    /// Number of distinct values examined by the boolean rule.
    /// Default: 10
    pub boolean_probe_size: usize,

    /// Maximum number of entries in a column's `top_values`.
    /// Default: 5
    pub top_values_limit: usize,

    /// `top_values` is also computed for non-string columns with fewer
    /// unique values than this.
    /// Default: 20
    pub categorical_unique_threshold: usize,

    /// Number of sample rows reported per analyzed file.
    /// Default: 5
    pub sample_row_limit: usize,

    /// Numeric columns whose null ratio is at most this value are filled with
    /// the median; above it they are filled with zero.
    /// Default: 0.5
    pub missing_value_threshold: f64,

    /// Share of non-null values that must coerce before a string column is
    /// promoted to numeric or datetime during processing.
    /// Default: 0.5
    pub mixed_column_promotion_ratio: f64,

    /// Window size of the trailing rolling average derived column.
    /// Default: 5
    pub rolling_window: usize,

    /// Literal used to fill missing values in string columns.
    /// Default: "Unknown"
    pub unknown_fill_value: String,

    /// Substrings marking a shared column as a candidate join key.
    /// Default: id, key, code, number
    pub relationship_keywords: Vec<String>,

    /// Whether to drop rows whose values are all null before cleaning.
    /// Default: true
    pub drop_empty_rows: bool,

    /// Optional deadline for a whole analyze/process call, in milliseconds.
    /// Default: None
    pub timeout_ms: Option<u64>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: [".xlsx", ".xls", ".csv", ".json", ".txt"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            csv_probe_rows: 1000,
            text_probe_lines: 5,
            inference_sample_size: 100,
            boolean_probe_size: 10,
            top_values_limit: 5,
            categorical_unique_threshold: 20,
            sample_row_limit: 5,
            missing_value_threshold: 0.5,
            mixed_column_promotion_ratio: 0.5,
            rolling_window: 5,
            unknown_fill_value: "Unknown".to_string(),
            relationship_keywords: ["id", "key", "code", "number"]
                .iter()
                .map(|kw| kw.to_string())
                .collect(),
            drop_empty_rows: true,
            timeout_ms: None,
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// The global deadline as a [`Duration`], if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Whether `extension` (lowercase, with leading dot) is on the allow-list.
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("missing_value_threshold", self.missing_value_threshold),
            (
                "mixed_column_promotion_ratio",
                self.mixed_column_promotion_ratio,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.allowed_extensions.is_empty() {
            return Err(ConfigValidationError::EmptyAllowList);
        }

        if let Some(ext) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigValidationError::InvalidExtension(ext.clone()));
        }

        for (field, value) in [
            ("max_file_size", usize::try_from(self.max_file_size).unwrap_or(usize::MAX)),
            ("rolling_window", self.rolling_window),
            ("inference_sample_size", self.inference_sample_size),
            ("top_values_limit", self.top_values_limit),
            ("text_probe_lines", self.text_probe_lines),
            ("csv_probe_rows", self.csv_probe_rows),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroValue(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroValue(String),

    #[error("The extension allow-list must not be empty")]
    EmptyAllowList,

    #[error("Invalid extension '{0}': extensions must start with '.'")]
    InvalidExtension(String),
}

/// Builder for [`ProcessorConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    allowed_extensions: Option<Vec<String>>,
    max_file_size: Option<u64>,
    csv_probe_rows: Option<usize>,
    text_probe_lines: Option<usize>,
    inference_sample_size: Option<usize>,
    boolean_probe_size: Option<usize>,
    top_values_limit: Option<usize>,
    categorical_unique_threshold: Option<usize>,
    sample_row_limit: Option<usize>,
    missing_value_threshold: Option<f64>,
    mixed_column_promotion_ratio: Option<f64>,
    rolling_window: Option<usize>,
    unknown_fill_value: Option<String>,
    relationship_keywords: Option<Vec<String>>,
    drop_empty_rows: Option<bool>,
    timeout_ms: Option<u64>,
}

impl ProcessorConfigBuilder {
    /// Replace the extension allow-list.
    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.into().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// Set the maximum accepted file size in bytes.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Set the number of rows parsed while probing delimited files.
    pub fn csv_probe_rows(mut self, rows: usize) -> Self {
        self.csv_probe_rows = Some(rows);
        self
    }

    /// Set the number of lines sampled from plain-text files.
    pub fn text_probe_lines(mut self, lines: usize) -> Self {
        self.text_probe_lines = Some(lines);
        self
    }

    /// Set the bounded sample size used by type inference.
    pub fn inference_sample_size(mut self, size: usize) -> Self {
        self.inference_sample_size = Some(size);
        self
    }

    /// Set the number of distinct values examined by the boolean rule.
    pub fn boolean_probe_size(mut self, size: usize) -> Self {
        self.boolean_probe_size = Some(size);
        self
    }

    /// Set the maximum length of `top_values`.
    pub fn top_values_limit(mut self, limit: usize) -> Self {
        self.top_values_limit = Some(limit);
        self
    }

    /// Set the unique-count threshold below which `top_values` is computed.
    pub fn categorical_unique_threshold(mut self, threshold: usize) -> Self {
        self.categorical_unique_threshold = Some(threshold);
        self
    }

    /// Set the number of sample rows reported per file.
    pub fn sample_row_limit(mut self, limit: usize) -> Self {
        self.sample_row_limit = Some(limit);
        self
    }

    /// Set the null ratio up to which numeric columns are median-filled.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn missing_value_threshold(mut self, threshold: f64) -> Self {
        self.missing_value_threshold = Some(threshold);
        self
    }

    /// Set the share of coercible values needed to promote a string column.
    pub fn mixed_column_promotion_ratio(mut self, ratio: f64) -> Self {
        self.mixed_column_promotion_ratio = Some(ratio);
        self
    }

    /// Set the rolling average window.
    pub fn rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = Some(window);
        self
    }

    /// Set the literal used to fill missing strings.
    pub fn unknown_fill_value(mut self, value: impl Into<String>) -> Self {
        self.unknown_fill_value = Some(value.into());
        self
    }

    /// Replace the candidate-key keywords used by relationship detection.
    pub fn relationship_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationship_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable dropping all-null rows during processing.
    pub fn drop_empty_rows(mut self, drop: bool) -> Self {
        self.drop_empty_rows = Some(drop);
        self
    }

    /// Set a global deadline for each analyze/process call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProcessorConfig` or an error if validation fails.
    pub fn build(self) -> Result<ProcessorConfig, ConfigValidationError> {
        let defaults = ProcessorConfig::default();
        let config = ProcessorConfig {
            allowed_extensions: self
                .allowed_extensions
                .unwrap_or(defaults.allowed_extensions),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            csv_probe_rows: self.csv_probe_rows.unwrap_or(defaults.csv_probe_rows),
            text_probe_lines: self.text_probe_lines.unwrap_or(defaults.text_probe_lines),
            inference_sample_size: self
                .inference_sample_size
                .unwrap_or(defaults.inference_sample_size),
            boolean_probe_size: self
                .boolean_probe_size
                .unwrap_or(defaults.boolean_probe_size),
            top_values_limit: self.top_values_limit.unwrap_or(defaults.top_values_limit),
            categorical_unique_threshold: self
                .categorical_unique_threshold
                .unwrap_or(defaults.categorical_unique_threshold),
            sample_row_limit: self.sample_row_limit.unwrap_or(defaults.sample_row_limit),
            missing_value_threshold: self
                .missing_value_threshold
                .unwrap_or(defaults.missing_value_threshold),
            mixed_column_promotion_ratio: self
                .mixed_column_promotion_ratio
                .unwrap_or(defaults.mixed_column_promotion_ratio),
            rolling_window: self.rolling_window.unwrap_or(defaults.rolling_window),
            unknown_fill_value: self
                .unknown_fill_value
                .unwrap_or(defaults.unknown_fill_value),
            relationship_keywords: self
                .relationship_keywords
                .unwrap_or(defaults.relationship_keywords),
            drop_empty_rows: self.drop_empty_rows.unwrap_or(defaults.drop_empty_rows),
            timeout_ms: self.timeout_ms,
        };

        config.validate()?;
        Ok(config)
    }
}
