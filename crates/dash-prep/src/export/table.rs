use polars::prelude::*;
use serde_json::Value;
use tracing::debug;

use crate::cleaner::CleanedTable;
use crate::types::{ExportColumn, ExportType, ProcessedTable, Row};
use crate::utils::{
    format_datetime_iso, is_datetime_dtype, is_float_dtype, is_integer_dtype, millis_to_datetime,
    series_to_f64, series_to_millis, series_to_strings,
};

// ============================================================================
// Value Serialization
// ============================================================================

/// Transport-safe JSON values of a column.
///
/// Integers become JSON integers, finite floats JSON numbers, NaN and
/// infinities null, timestamps ISO 8601 strings. Anything else is emitted
/// as its string form. Never fails: a column whose typed read fails falls
/// back to strings.
pub fn json_values(series: &Series) -> Vec<Value> {
    let dtype = series.dtype();

    let typed: Option<Vec<Value>> = if matches!(dtype, DataType::Boolean) {
        series
            .bool()
            .ok()
            .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, Value::Bool)).collect())
    } else if matches!(dtype, DataType::UInt64) {
        series
            .u64()
            .ok()
            .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect())
    } else if is_integer_dtype(dtype) {
        series.cast(&DataType::Int64).ok().and_then(|s| {
            s.i64()
                .ok()
                .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect())
        })
    } else if is_float_dtype(dtype) {
        series_to_f64(series)
            .ok()
            .map(|values| values.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect())
    } else if is_datetime_dtype(dtype) {
        series_to_millis(series).ok().map(|values| {
            values
                .into_iter()
                .map(|v| {
                    v.and_then(millis_to_datetime)
                        .map_or(Value::Null, |dt| Value::String(format_datetime_iso(&dt)))
                })
                .collect()
        })
    } else {
        None
    };

    typed.unwrap_or_else(|| {
        series_to_strings(series)
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::String))
            .collect()
    })
}

/// Destination type of a column, from its storage type.
pub fn export_type(dtype: &DataType) -> ExportType {
    if is_integer_dtype(dtype) {
        ExportType::Int64
    } else if is_float_dtype(dtype) {
        ExportType::Double
    } else if matches!(dtype, DataType::Boolean) {
        ExportType::Boolean
    } else if is_datetime_dtype(dtype) {
        ExportType::DateTime
    } else {
        ExportType::String
    }
}

/// Convert a frame into row records, preserving column order.
pub fn frame_rows(frame: &DataFrame) -> Vec<Row> {
    let columns: Vec<(String, Vec<Value>)> = frame
        .get_columns()
        .iter()
        .map(|c| (c.name().to_string(), json_values(c.as_materialized_series())))
        .collect();

    (0..frame.height())
        .map(|i| {
            columns
                .iter()
                .map(|(name, values)| (name.clone(), values.get(i).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect()
}

// ============================================================================
// Table Exporter
// ============================================================================

/// Builds export-ready tables from cleaned frames.
pub struct TableExporter;

impl TableExporter {
    pub fn export(name: &str, table: &CleanedTable) -> ProcessedTable {
        let schema: Vec<ExportColumn> = table
            .frame
            .get_columns()
            .iter()
            .map(|c| ExportColumn {
                name: c.name().to_string(),
                data_type: export_type(c.dtype()),
                nullable: c.null_count() > 0,
            })
            .collect();

        let rows = frame_rows(&table.frame);
        debug!(
            "Exported table '{}': {} rows, {} columns",
            name,
            rows.len(),
            schema.len()
        );

        ProcessedTable {
            name: name.to_string(),
            row_count: table.frame.height(),
            column_count: schema.len(),
            schema,
            rows,
            cleaning_steps: table.steps.clone(),
        }
    }
}
