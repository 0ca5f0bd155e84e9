//! JSON record reader.
//!
//! Nested objects are flattened into `parent.child` columns; arrays nested
//! inside a record are kept as their JSON text.

use indexmap::{IndexMap, IndexSet};
use polars::prelude::*;
use serde_json::{Map, Value};
use tracing::debug;

use super::cells::{Cell, build_series};
use super::{RawTable, RecordStructure, SourceFormat, SourceMetadata};
use crate::error::{ProcessingError, Result};

/// Read a JSON document into a table.
///
/// - a top-level array is read as one row per element;
/// - a top-level object holding a non-empty array of objects is read from
///   the first such key;
/// - any other object is read as a single row, its arrays kept as JSON text.
pub fn read(bytes: &[u8]) -> Result<RawTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProcessingError::MalformedContent(format!("invalid UTF-8: {}", e)))?;
    let document: Value = serde_json::from_str(text)
        .map_err(|e| ProcessingError::MalformedContent(format!("invalid JSON: {}", e)))?;

    let (records, metadata) = match &document {
        Value::Array(items) => (
            items.iter().collect::<Vec<_>>(),
            SourceMetadata::Records {
                structure: RecordStructure::List,
                records_key: None,
                original_keys: None,
            },
        ),
        Value::Object(map) => {
            let original_keys = Some(map.keys().cloned().collect());
            match map.iter().find(|(_, v)| is_record_list(v)) {
                Some((key, Value::Array(items))) => {
                    debug!("Reading records from key '{}'", key);
                    (
                        items.iter().collect(),
                        SourceMetadata::Records {
                            structure: RecordStructure::Dict,
                            records_key: Some(key.clone()),
                            original_keys,
                        },
                    )
                }
                _ => (
                    vec![&document],
                    SourceMetadata::Records {
                        structure: RecordStructure::Single,
                        records_key: None,
                        original_keys,
                    },
                ),
            }
        }
        _ => {
            return Err(ProcessingError::MalformedContent(
                "unsupported JSON structure: expected an array or an object".to_string(),
            ));
        }
    };

    let frame = records_to_frame(&records)?;
    Ok(RawTable::new(frame, SourceFormat::Records, metadata))
}

/// A non-empty array whose every element is an object.
fn is_record_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_object))
}

fn records_to_frame(records: &[&Value]) -> Result<DataFrame> {
    let mut rows: Vec<IndexMap<String, Cell>> = Vec::with_capacity(records.len());
    let mut labels: IndexSet<String> = IndexSet::new();

    for (index, record) in records.iter().enumerate() {
        let Value::Object(map) = record else {
            return Err(ProcessingError::MalformedContent(format!(
                "record {} is not an object",
                index
            )));
        };

        let mut row = IndexMap::new();
        flatten_into("", map, &mut row);
        labels.extend(row.keys().cloned());
        rows.push(row);
    }

    if labels.is_empty() {
        return Err(ProcessingError::EmptyOrUnreadable(
            "no records with fields found".to_string(),
        ));
    }

    let columns = labels
        .iter()
        .map(|label| {
            let cells: Vec<Cell> = rows
                .iter()
                .map(|row| row.get(label).cloned().unwrap_or(Cell::Null))
                .collect();
            build_series(label, &cells, false).map(|s| s.into_column())
        })
        .collect::<PolarsResult<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut IndexMap<String, Cell>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&path, inner, out),
            other => {
                out.insert(path, json_cell(other));
            }
        }
    }
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
    }
}
