use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;
use crate::reader::SourceMetadata;

/// One row of a table keyed by column name, in column order.
pub type Row = IndexMap<String, serde_json::Value>;

// ============================================================================
// Schema Types
// ============================================================================

/// Semantic type assigned to a column by the inferencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Int,
    Float,
    Bool,
    Datetime,
    String,
}

impl InferredType {
    /// Whether this type carries numeric statistics.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// The cross-file category this type is reported under.
    ///
    /// Booleans are reported as text.
    pub fn category(self) -> TypeCategory {
        match self {
            Self::Int | Self::Float => TypeCategory::Numeric,
            Self::Datetime => TypeCategory::Date,
            Self::Bool | Self::String => TypeCategory::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Datetime => "datetime",
            Self::String => "string",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse category used by the unified schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Numeric,
    Date,
    Text,
}

/// Descriptive statistics of a numeric column.
///
/// Every aggregate is absent rather than NaN or infinite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    /// Sample standard deviation; absent for fewer than two values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Per-column metadata produced by the profiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Normalized name, unique within its table.
    pub name: String,
    /// Label as it appeared in the source file.
    pub raw_name: String,
    pub inferred_type: InferredType,
    pub null_count: usize,
    /// Distinct non-null values.
    pub unique_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_stats: Option<NumericStats>,
    /// Most frequent values rendered as strings, most frequent first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_values: Option<IndexMap<String, usize>>,
}

/// Ordered column profiles of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    pub columns: Vec<ColumnProfile>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnProfile>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.columns.iter()
    }

    /// Normalized names in table order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Raw labels in table order.
    pub fn raw_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.raw_name.clone()).collect()
    }
}

// ============================================================================
// Analysis Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
}

/// Outcome of analyzing one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub status: FileStatus,
    /// Lowercase extension with its leading dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub row_count: usize,
    /// Normalized column names.
    pub columns: Vec<String>,
    /// Column labels as read from the file.
    pub original_columns: Vec<String>,
    pub schema: TableSchema,
    pub sample_rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SourceMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl FileAnalysis {
    /// Build the entry recorded for a file whose analysis failed.
    pub fn failed(filename: impl Into<String>, error: &ProcessingError) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Error,
            file_type: None,
            row_count: 0,
            columns: Vec::new(),
            original_columns: Vec::new(),
            schema: TableSchema::default(),
            sample_rows: Vec::new(),
            metadata: None,
            error: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Entry of the unified cross-file schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedColumn {
    #[serde(rename = "type")]
    pub data_type: InferredType,
    pub category: TypeCategory,
}

/// Result of the analysis pass over a batch of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub files: Vec<FileAnalysis>,
    /// Number of inputs, failures included.
    pub total_files: usize,
    pub total_rows: usize,
    /// Union of normalized column names by first appearance.
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub text_columns: Vec<String>,
    /// Normalized name to inferred type; later files win.
    pub data_types: IndexMap<String, InferredType>,
    pub schema: IndexMap<String, UnifiedColumn>,
    pub summary: String,
    /// File stem to sample rows.
    pub sample_data: IndexMap<String, Vec<Row>>,
}

impl AnalysisResult {
    pub fn successful_files(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.files.iter().filter(|f| f.is_success())
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.files.iter().filter(|f| !f.is_success())
    }
}

// ============================================================================
// Export Types
// ============================================================================

/// Destination type vocabulary of exported columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportType {
    Int64,
    Double,
    Boolean,
    DateTime,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ExportType,
    /// Whether any value in the column is null.
    pub nullable: bool,
}

/// Cleaned, typed, export-ready representation of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedTable {
    pub name: String,
    pub schema: Vec<ExportColumn>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub column_count: usize,
    /// Human-readable record of every cleaning action taken.
    pub cleaning_steps: Vec<String>,
}

impl ProcessedTable {
    /// Column names in export order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ManyToOne,
}

/// Probable join between two processed tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub to_table: String,
    pub from_column: String,
    pub to_column: String,
    pub cardinality: Cardinality,
}

/// Result of the processing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub tables: IndexMap<String, ProcessedTable>,
    pub relationships: Vec<Relationship>,
    pub total_rows: usize,
    pub summary: String,
}

// ============================================================================
// Dashboard Plan Types
// ============================================================================

/// Aggregate requested by a dashboard KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiCalculation {
    /// Running cumulative sum, emitted as `<name>_Total`.
    Sum,
    /// Trailing rolling mean, emitted as `<name>_Avg`.
    Average,
    /// Constant count of one per row, emitted as `<name>_Count`.
    Count,
}

impl KpiCalculation {
    /// Suffix appended to the KPI name to form the derived column name.
    pub fn column_suffix(self) -> &'static str {
        match self {
            Self::Sum => "Total",
            Self::Average => "Avg",
            Self::Count => "Count",
        }
    }
}

impl FromStr for KpiCalculation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUM" => Ok(Self::Sum),
            "AVERAGE" => Ok(Self::Average),
            "COUNT" => Ok(Self::Count),
            other => Err(format!("unknown KPI calculation '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kpi {
    pub name: String,
    pub field: String,
    pub calculation: String,
}

impl Kpi {
    /// The parsed calculation, if it is one of the recognised aggregates.
    pub fn parsed_calculation(&self) -> Option<KpiCalculation> {
        self.calculation.parse().ok()
    }
}

/// Externally supplied dashboard plan.
///
/// Only `kpis` drives processing; every other field is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardPlan {
    #[serde(default)]
    pub kpis: Vec<Kpi>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inferred_type_category() {
        assert_eq!(InferredType::Int.category(), TypeCategory::Numeric);
        assert_eq!(InferredType::Float.category(), TypeCategory::Numeric);
        assert_eq!(InferredType::Datetime.category(), TypeCategory::Date);
        assert_eq!(InferredType::Bool.category(), TypeCategory::Text);
        assert_eq!(InferredType::String.category(), TypeCategory::Text);
    }

    #[test]
    fn test_inferred_type_serialization() {
        let json = serde_json::to_string(&InferredType::Datetime).unwrap();
        assert_eq!(json, "\"datetime\"");
        assert_eq!(InferredType::Float.to_string(), "float");
    }

    #[test]
    fn test_kpi_calculation_parse() {
        assert_eq!("SUM".parse::<KpiCalculation>(), Ok(KpiCalculation::Sum));
        assert_eq!("average".parse::<KpiCalculation>(), Ok(KpiCalculation::Average));
        assert_eq!(" Count ".parse::<KpiCalculation>(), Ok(KpiCalculation::Count));
        assert!("MEDIAN".parse::<KpiCalculation>().is_err());
    }

    #[test]
    fn test_dashboard_plan_preserves_other_fields() {
        let json = r#"{
            "title": "Sales",
            "kpis": [{"name": "Revenue", "field": "Sales", "calculation": "sum"}],
            "charts": [{"type": "bar"}]
        }"#;
        let plan: DashboardPlan = serde_json::from_str(json).unwrap();

        assert_eq!(plan.kpis.len(), 1);
        assert_eq!(plan.kpis[0].parsed_calculation(), Some(KpiCalculation::Sum));
        assert!(plan.other.contains_key("title"));
        assert!(plan.other.contains_key("charts"));

        let back = serde_json::to_value(&plan).unwrap();
        assert_eq!(back["title"], "Sales");
    }

    #[test]
    fn test_kpi_missing_fields_default_to_empty() {
        let plan: DashboardPlan = serde_json::from_str(r#"{"kpis": [{"name": "x"}]}"#).unwrap();
        assert_eq!(plan.kpis[0].field, "");
        assert_eq!(plan.kpis[0].parsed_calculation(), None);
    }

    #[test]
    fn test_relationship_serialization() {
        let rel = Relationship {
            from_table: "orders".to_string(),
            to_table: "customers".to_string(),
            from_column: "customer_id".to_string(),
            to_column: "customer_id".to_string(),
            cardinality: Cardinality::ManyToOne,
        };
        let value = serde_json::to_value(&rel).unwrap();
        assert_eq!(value["cardinality"], "many_to_one");
    }

    #[test]
    fn test_export_column_serialization() {
        let col = ExportColumn {
            name: "amount".to_string(),
            data_type: ExportType::Double,
            nullable: false,
        };
        let value = serde_json::to_value(&col).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "amount", "type": "Double", "nullable": false})
        );
    }

    #[test]
    fn test_failed_file_analysis() {
        let err = ProcessingError::UnsupportedFormat(".pdf".to_string());
        let entry = FileAnalysis::failed("report.pdf", &err);
        assert!(!entry.is_success());
        assert_eq!(entry.error_code.as_deref(), Some("UNSUPPORTED_FORMAT"));

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "error");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_table_schema_names() {
        let profile = |name: &str, ty| ColumnProfile {
            name: name.to_string(),
            raw_name: name.to_string(),
            inferred_type: ty,
            null_count: 0,
            unique_count: 0,
            numeric_stats: None,
            top_values: None,
        };
        let schema = TableSchema::new(vec![
            profile("Date", InferredType::Datetime),
            profile("Sales", InferredType::Int),
            profile("Region", InferredType::String),
        ]);

        assert_eq!(schema.names(), vec!["Date", "Sales", "Region"]);
        assert_eq!(schema.raw_names(), vec!["Date", "Sales", "Region"]);
        assert_eq!(schema.len(), 3);
    }
}
