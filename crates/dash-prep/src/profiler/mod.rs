//! Data profiling module for table analysis.
//!
//! This module provides functionality for profiling raw tables, including:
//! - Column name normalization and disambiguation
//! - Type inference for columns
//! - Statistical analysis

mod naming;
mod statistics;
mod type_inference;

pub use naming::{ColumnNameNormalizer, UNNAMED_COLUMN};
pub use statistics::StatisticsCalculator;
pub use type_inference::TypeInferencer;

use polars::prelude::*;
use tracing::debug;

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::export::json_values;
use crate::reader::RawTable;
use crate::types::{ColumnProfile, InferredType, Row, TableSchema};

/// A raw table read through its schema: columns carry normalized names.
#[derive(Debug, Clone)]
pub struct ProfiledTable {
    pub schema: TableSchema,
    pub frame: DataFrame,
}

/// Data profiler for analyzing table structure.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile every column of a raw table.
    ///
    /// Labels are normalized (and disambiguated) first; the returned frame
    /// holds the raw values under the normalized names.
    pub fn profile_table(table: &RawTable, config: &ProcessorConfig) -> Result<ProfiledTable> {
        let raw_labels = table.raw_labels();
        let names = ColumnNameNormalizer::normalize_all(&raw_labels);

        let mut columns = Vec::with_capacity(names.len());
        let mut profiles: Vec<ColumnProfile> = Vec::with_capacity(names.len());

        for ((column, name), raw_name) in table
            .frame()
            .get_columns()
            .iter()
            .zip(&names)
            .zip(&raw_labels)
        {
            let series = column
                .as_materialized_series()
                .clone()
                .with_name(name.as_str().into());

            let inferred_type = if table.is_unstructured() {
                InferredType::String
            } else {
                TypeInferencer::infer(&series, config)
            };
            debug!("Column '{}' -> '{}' inferred as {}", raw_name, name, inferred_type);

            profiles.push(StatisticsCalculator::profile_column(
                &series,
                raw_name,
                inferred_type,
                config,
            ));
            columns.push(series.into_column());
        }

        Ok(ProfiledTable {
            schema: TableSchema::new(profiles),
            frame: DataFrame::new(columns)?,
        })
    }

    /// The first `limit` rows of a frame as JSON-safe records.
    pub fn sample_rows(frame: &DataFrame, limit: usize) -> Vec<Row> {
        let head = frame.head(Some(limit));
        let columns: Vec<(String, Vec<serde_json::Value>)> = head
            .get_columns()
            .iter()
            .map(|c| {
                (
                    c.name().to_string(),
                    json_values(c.as_materialized_series()),
                )
            })
            .collect();

        (0..head.height())
            .map(|i| {
                columns
                    .iter()
                    .map(|(name, values)| {
                        (
                            name.clone(),
                            values.get(i).cloned().unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect()
            })
            .collect()
    }
}
