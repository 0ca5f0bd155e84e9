//! Data cleaning module for the processing pass.
//!
//! This module provides functionality for:
//! - Removing rows whose values are all missing
//! - Promoting mostly-numeric or mostly-temporal text columns
//! - Coercing every column to the storage of its inferred type
//! - Imputing missing values per type
//! - Deriving plan-requested and calendar columns ([`derived`])

mod converters;
pub mod derived;

pub use derived::DerivedColumns;

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::profiler::ProfiledTable;
use crate::types::InferredType;
use crate::utils::millis_series;
use converters::{coercion_ratio, to_boolean, to_datetime_millis, to_numeric};

/// A cleaned table: every column stored as its final type.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub frame: DataFrame,
    /// Final type of every column, in column order.
    pub column_types: Vec<(String, InferredType)>,
    /// Human-readable record of every action taken.
    pub steps: Vec<String>,
}

/// Data cleaner applying the imputation and coercion policy.
pub struct DataCleaner;

impl DataCleaner {
    /// Clean a profiled table.
    ///
    /// Per inferred type:
    /// 1. `int` / `float`: coerce to numbers, fill with the median (or zero
    ///    when too sparse)
    /// 2. `bool`: coerce to booleans, leaving unconvertible values null
    /// 3. `datetime`: coerce to timestamps, forward fill
    /// 4. `string`: promote to numeric or datetime when enough values
    ///    convert, otherwise fill with the unknown literal
    pub fn clean(
        table: &ProfiledTable,
        unstructured: bool,
        config: &ProcessorConfig,
    ) -> Result<CleanedTable> {
        let mut df = table.frame.clone();
        let mut steps = Vec::new();

        info!("Cleaning {} rows x {} columns", df.height(), df.width());

        if config.drop_empty_rows {
            Self::drop_empty_rows(&mut df, &mut steps)?;
        }

        let mut column_types = Vec::with_capacity(table.schema.len());
        for profile in table.schema.iter() {
            let name = profile.name.as_str();
            let target = if profile.inferred_type == InferredType::String && !unstructured {
                Self::promote_text(&mut df, name, config, &mut steps)?
            } else {
                profile.inferred_type
            };

            match target {
                InferredType::Int | InferredType::Float => {
                    Self::coerce_numeric(&mut df, name, target, &mut steps)?;
                    StatisticalImputer::apply_median_or_zero(
                        &mut df,
                        name,
                        config.missing_value_threshold,
                        &mut steps,
                    )?;
                }
                InferredType::Bool => Self::coerce_boolean(&mut df, name, &mut steps)?,
                InferredType::Datetime => {
                    Self::coerce_datetime(&mut df, name, &mut steps)?;
                    StatisticalImputer::apply_forward_fill(&mut df, name, &mut steps)?;
                }
                InferredType::String => StatisticalImputer::apply_constant(
                    &mut df,
                    name,
                    &config.unknown_fill_value,
                    &mut steps,
                )?,
            }

            column_types.push((profile.name.clone(), target));
        }

        debug!("Cleaning produced {} steps", steps.len());
        Ok(CleanedTable {
            frame: df,
            column_types,
            steps,
        })
    }

    /// Remove rows in which every value is null.
    fn drop_empty_rows(df: &mut DataFrame, steps: &mut Vec<String>) -> Result<()> {
        if df.width() == 0 || df.height() == 0 {
            return Ok(());
        }

        let mut keep = vec![false; df.height()];
        for column in df.get_columns() {
            let nulls = column.as_materialized_series().is_null();
            for (flag, is_null) in keep.iter_mut().zip(nulls.into_iter()) {
                if is_null == Some(false) {
                    *flag = true;
                }
            }
        }

        let removed = keep.iter().filter(|k| !**k).count();
        if removed > 0 {
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            *df = df.filter(&mask)?;
            steps.push(format!("Removed {} empty rows", removed));
            debug!("Removed {} empty rows", removed);
        }
        Ok(())
    }

    /// Decide whether a text column should be read as numbers or timestamps.
    ///
    /// The column itself is left untouched; the returned type drives the
    /// conversion.
    fn promote_text(
        df: &mut DataFrame,
        name: &str,
        config: &ProcessorConfig,
        steps: &mut Vec<String>,
    ) -> Result<InferredType> {
        let series = df.column(name)?.as_materialized_series();
        let non_null = series.len() - series.null_count();
        if non_null == 0 {
            return Ok(InferredType::String);
        }

        let numeric = to_numeric(series);
        let ratio = coercion_ratio(non_null, &numeric);
        if ratio >= config.mixed_column_promotion_ratio {
            steps.push(format!(
                "Converted '{}' from text to numeric ({:.0}% of values parsed)",
                name,
                ratio * 100.0
            ));
            return Ok(InferredType::Float);
        }

        let temporal = to_datetime_millis(series);
        let ratio = coercion_ratio(non_null, &temporal);
        if ratio >= config.mixed_column_promotion_ratio {
            steps.push(format!(
                "Converted '{}' from text to datetime ({:.0}% of values parsed)",
                name,
                ratio * 100.0
            ));
            return Ok(InferredType::Datetime);
        }

        Ok(InferredType::String)
    }

    fn coerce_numeric(
        df: &mut DataFrame,
        name: &str,
        target: InferredType,
        steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(name)?.as_materialized_series().clone();
        let before = series.null_count();

        let coerced = if target == InferredType::Int {
            series.cast(&DataType::Int64)?
        } else {
            Series::new(name.into(), to_numeric(&series))
        };

        Self::record_lost(name, before, coerced.null_count(), "numbers", steps);
        df.replace(name, coerced)?;
        Ok(())
    }

    fn coerce_boolean(df: &mut DataFrame, name: &str, steps: &mut Vec<String>) -> Result<()> {
        let series = df.column(name)?.as_materialized_series().clone();
        let before = series.null_count();

        let coerced = Series::new(name.into(), to_boolean(&series));
        Self::record_lost(name, before, coerced.null_count(), "booleans", steps);
        df.replace(name, coerced)?;
        Ok(())
    }

    fn coerce_datetime(df: &mut DataFrame, name: &str, steps: &mut Vec<String>) -> Result<()> {
        let series = df.column(name)?.as_materialized_series().clone();
        let before = series.null_count();

        let coerced = millis_series(name.into(), to_datetime_millis(&series))?;
        Self::record_lost(name, before, coerced.null_count(), "timestamps", steps);
        df.replace(name, coerced)?;
        Ok(())
    }

    fn record_lost(name: &str, before: usize, after: usize, kind: &str, steps: &mut Vec<String>) {
        let lost = after.saturating_sub(before);
        if lost > 0 {
            steps.push(format!(
                "Set {} values in '{}' to null (not convertible to {})",
                lost, name, kind
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use crate::reader::{RawTable, SourceFormat, SourceMetadata};
    use crate::utils::{series_to_millis, series_to_strings};

    fn raw(frame: DataFrame) -> RawTable {
        RawTable::new(
            frame,
            SourceFormat::Records,
            SourceMetadata::Records {
                structure: crate::reader::RecordStructure::List,
                records_key: None,
                original_keys: None,
            },
        )
    }

    fn profile(frame: DataFrame) -> ProfiledTable {
        DataProfiler::profile_table(&raw(frame), &ProcessorConfig::default()).unwrap()
    }

    fn clean(frame: DataFrame) -> CleanedTable {
        DataCleaner::clean(&profile(frame), false, &ProcessorConfig::default()).unwrap()
    }

    fn f64_values(cleaned: &CleanedTable, name: &str) -> Vec<Option<f64>> {
        cleaned
            .frame
            .column(name)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_mixed_text_promoted_and_median_filled() {
        let frame = df![
            "id" => [1i64, 2],
            "amt" => ["10.5", "bad"],
        ]
        .unwrap();

        let cleaned = clean(frame);
        assert_eq!(f64_values(&cleaned, "amt"), vec![Some(10.5), Some(10.5)]);
        assert!(cleaned.column_types.contains(&("amt".to_string(), InferredType::Float)));
        assert!(cleaned.steps.iter().any(|s| s.contains("from text to numeric")));
    }

    #[test]
    fn test_imputation_threshold_49_and_51_percent() {
        // 49 nulls out of 100 -> median; 51 out of 100 -> zero
        let mut low: Vec<Option<f64>> = vec![Some(8.0); 51];
        low.extend(vec![None; 49]);
        let mut high: Vec<Option<f64>> = vec![Some(8.0); 49];
        high.extend(vec![None; 51]);

        let frame = df!["low" => low, "high" => high, "keep" => vec![1i64; 100]].unwrap();
        let cleaned = clean(frame);

        assert_eq!(f64_values(&cleaned, "low")[99], Some(8.0));
        assert_eq!(f64_values(&cleaned, "high")[99], Some(0.0));
    }

    #[test]
    fn test_string_fill_unknown() {
        let frame = df![
            "region" => [Some("West"), None, Some("East")],
            "n" => [1i64, 2, 3],
        ]
        .unwrap();

        let cleaned = clean(frame);
        let values =
            series_to_strings(cleaned.frame.column("region").unwrap().as_materialized_series());
        assert_eq!(values[1].as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_datetime_forward_fill() {
        let frame = df![
            "when" => [None, Some("1970-01-01"), None],
            "n" => [1i64, 2, 3],
        ]
        .unwrap();

        let cleaned = clean(frame);
        let when = series_to_millis(cleaned.frame.column("when").unwrap().as_materialized_series())
            .unwrap();
        assert_eq!(when, vec![None, Some(0), Some(0)]);
    }

    #[test]
    fn test_boolean_coercion_leaves_nulls() {
        let frame = df![
            "active" => [Some("yes"), None, Some("no")],
            "n" => [1i64, 2, 3],
        ]
        .unwrap();

        let cleaned = clean(frame);
        let active = cleaned.frame.column("active").unwrap();
        assert_eq!(active.dtype(), &DataType::Boolean);
        assert_eq!(active.null_count(), 1);
    }

    #[test]
    fn test_empty_rows_dropped() {
        let frame = df![
            "a" => [Some(1i64), None, Some(3)],
            "b" => [Some("x"), None, None],
        ]
        .unwrap();

        let cleaned = clean(frame);
        assert_eq!(cleaned.frame.height(), 2);
        assert!(cleaned.steps[0].contains("Removed 1 empty rows"));
    }

    #[test]
    fn test_unstructured_text_not_promoted() {
        let frame = df!["text_content" => ["1", "2", "3"]].unwrap();
        let table = raw(frame).into_unstructured();
        let config = ProcessorConfig::default();
        let profiled = DataProfiler::profile_table(&table, &config).unwrap();
        let cleaned = DataCleaner::clean(&profiled, true, &config).unwrap();
        assert_eq!(
            cleaned.frame.column("text_content").unwrap().dtype(),
            &DataType::String
        );
    }
}
