//! Format-specific ingestion of uploaded files.
//!
//! [`read_file`] validates a path against the configured allow-list and size
//! ceiling, then dispatches on the file extension to one of the readers:
//!
//! - [`spreadsheet`]: `.xlsx` / `.xls` workbooks, main sheet = widest sheet
//! - [`delimited`]: `.csv`, probing encodings and delimiters
//! - [`records`]: `.json`, flattening nested records into rows
//! - [`text`]: `.txt`, sniffing a delimiter or falling back to raw lines
//!
//! Every reader produces a [`RawTable`]: a polars `DataFrame` holding the raw
//! labels and values plus a record of the decisions the reader made.

pub mod cells;
pub mod delimited;
pub mod records;
pub mod spreadsheet;
pub mod text;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};

/// Source format family, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Spreadsheet,
    Delimited,
    Records,
    PlainText,
}

impl SourceFormat {
    /// The reader for a lowercase, dotted extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".xlsx" | ".xls" => Some(Self::Spreadsheet),
            ".csv" => Some(Self::Delimited),
            ".json" => Some(Self::Records),
            ".txt" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Shape of the top level of a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStructure {
    /// A list of records.
    List,
    /// An object holding a list of records under some key.
    Dict,
    /// A single object read as one row.
    Single,
}

/// How a plain-text file was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLayout {
    Delimited,
    PlainText,
}

/// What a reader decided while decoding a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMetadata {
    Spreadsheet {
        sheet_names: Vec<String>,
        main_sheet: String,
    },
    Delimited {
        encoding: String,
        delimiter: String,
    },
    Records {
        structure: RecordStructure,
        #[serde(skip_serializing_if = "Option::is_none")]
        records_key: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        original_keys: Option<Vec<String>>,
    },
    PlainText {
        detected_as: TextLayout,
        #[serde(skip_serializing_if = "Option::is_none")]
        delimiter: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line_count: Option<usize>,
    },
}

/// Columnar data as read from a source file, before typing or cleaning.
///
/// Immutable once returned by a reader.
#[derive(Debug, Clone)]
pub struct RawTable {
    frame: DataFrame,
    format: SourceFormat,
    metadata: SourceMetadata,
    unstructured: bool,
}

impl RawTable {
    pub(crate) fn new(frame: DataFrame, format: SourceFormat, metadata: SourceMetadata) -> Self {
        Self {
            frame,
            format,
            metadata,
            unstructured: false,
        }
    }

    /// Mark the table as raw lines of unstructured text.
    pub(crate) fn into_unstructured(mut self) -> Self {
        self.unstructured = true;
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Column labels as they appeared in the source, in order.
    pub fn raw_labels(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Whether the table is a single column of raw text lines.
    pub fn is_unstructured(&self) -> bool {
        self.unstructured
    }
}

/// Lowercase extension of `path` with its leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Header labels with blanks replaced by `Unnamed: <index>` and repeats
/// suffixed `.1`, `.2`, ...
pub(crate) fn unique_labels(raw: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, label)| {
            let base = match label {
                Some(label) if !label.trim().is_empty() => label,
                _ => format!("Unnamed: {}", index),
            };

            let mut label = base.clone();
            let mut suffix = 1;
            while !seen.insert(label.clone()) {
                label = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            label
        })
        .collect()
}

/// Read a file into a [`RawTable`].
///
/// Checks run in order: existence, extension allow-list, reader
/// availability, size ceiling. No content is parsed before all four pass.
pub fn read_file(path: &Path, config: &ProcessorConfig) -> Result<RawTable> {
    if !path.exists() {
        return Err(ProcessingError::FileNotFound(path.to_path_buf()));
    }

    let extension = extension_of(path);
    if !config.is_allowed_extension(&extension) {
        return Err(ProcessingError::UnsupportedFormat(extension));
    }
    let format = SourceFormat::from_extension(&extension)
        .ok_or_else(|| ProcessingError::UnsupportedFormat(extension.clone()))?;

    let size = std::fs::metadata(path)?.len();
    if size > config.max_file_size {
        return Err(ProcessingError::SizeExceeded {
            size,
            max: config.max_file_size,
        });
    }

    info!("Reading {} ({} bytes) as {:?}", path.display(), size, format);

    let table = match format {
        SourceFormat::Spreadsheet => spreadsheet::read(path)?,
        SourceFormat::Delimited => delimited::read(&std::fs::read(path)?, config)?,
        SourceFormat::Records => records::read(&std::fs::read(path)?)?,
        SourceFormat::PlainText => text::read(&std::fs::read(path)?, config)?,
    };

    info!(
        "Read {} rows x {} columns from {}",
        table.row_count(),
        table.frame().width(),
        path.display()
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/data/Sales.CSV")), ".csv");
        assert_eq!(extension_of(Path::new("report.xlsx")), ".xlsx");
        assert_eq!(extension_of(Path::new("README")), "");
    }

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension(".xls"), Some(SourceFormat::Spreadsheet));
        assert_eq!(SourceFormat::from_extension(".txt"), Some(SourceFormat::PlainText));
        assert_eq!(SourceFormat::from_extension(".pdf"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = read_file(Path::new("/no/such/file.csv"), &ProcessorConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".pdf", b"%PDF-1.4");
        let err = read_file(file.path(), &ProcessorConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_allowed_extension_without_reader() {
        let file = temp_file(".parquet", b"PAR1");
        let config = ProcessorConfig::builder()
            .allowed_extensions([".csv", ".parquet"])
            .build()
            .unwrap();
        let err = read_file(file.path(), &config).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_size_ceiling_checked_before_parsing() {
        // Not valid JSON: a size error proves nothing was parsed
        let file = temp_file(".json", b"{{{{ not json at all");
        let config = ProcessorConfig::builder().max_file_size(4).build().unwrap();
        let err = read_file(file.path(), &config).unwrap_err();
        assert!(matches!(err, ProcessingError::SizeExceeded { max: 4, .. }));
    }

    #[test]
    fn test_dispatch_csv() {
        let file = temp_file(".csv", b"a,b\n1,2\n3,4\n");
        let table = read_file(file.path(), &ProcessorConfig::default()).unwrap();
        assert_eq!(table.format(), SourceFormat::Delimited);
        assert_eq!(table.raw_labels(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
        assert!(!table.is_unstructured());
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = SourceMetadata::Delimited {
            encoding: "utf-8".to_string(),
            delimiter: ";".to_string(),
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["kind"], "delimited");
        assert_eq!(value["delimiter"], ";");
    }
}
