//! Statistical imputation methods.
//!
//! Provides median-or-zero, constant, and forward-fill strategies. Each
//! method replaces the column in place and records what it did.

use polars::prelude::*;

use crate::error::Result;
use crate::profiler::StatisticsCalculator;
use crate::utils::{
    format_float, is_integer_dtype, millis_series, series_to_f64, series_to_millis,
    series_to_strings,
};

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill a numeric column with its median when the share of nulls is at
    /// most `threshold`, otherwise with zero.
    ///
    /// Integer columns are filled with the median rounded to the nearest
    /// integer and keep their integer storage.
    pub fn apply_median_or_zero(
        df: &mut DataFrame,
        col_name: &str,
        threshold: f64,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let missing = series.null_count();
        if missing == 0 || series.is_empty() {
            return Ok(());
        }

        let ratio = missing as f64 / series.len() as f64;
        let present: Vec<f64> = series_to_f64(&series)?.into_iter().flatten().collect();
        let median = StatisticsCalculator::numeric_stats(&present).median;

        let (fill_value, method) = match median {
            Some(median) if ratio <= threshold => (median, "median"),
            _ => (0.0, "zero"),
        };

        let filled = if is_integer_dtype(series.dtype()) {
            let fill = fill_value.round() as i64;
            let values: Vec<Option<i64>> = series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| Some(v.unwrap_or(fill)))
                .collect();
            Series::new(col_name.into(), values)
        } else {
            let values: Vec<Option<f64>> = series_to_f64(&series)?
                .into_iter()
                .map(|v| Some(v.unwrap_or(fill_value)))
                .collect();
            Series::new(col_name.into(), values)
        };
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled {} missing values in '{}' with {} ({}); {:.1}% missing",
            missing,
            col_name,
            method,
            format_float(fill_value),
            ratio * 100.0
        ));

        Ok(())
    }

    /// Fill nulls with a constant string, converting the column to text.
    pub fn apply_constant(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let missing = series.null_count();

        let values: Vec<Option<String>> = series_to_strings(&series)
            .into_iter()
            .map(|v| Some(v.unwrap_or_else(|| fill_value.to_string())))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), values))?;

        if missing > 0 {
            processing_steps.push(format!(
                "Filled {} missing values in '{}' with '{}'",
                missing, col_name, fill_value
            ));
        }

        Ok(())
    }

    /// Propagate the last non-null timestamp forward. Leading nulls stay null.
    pub fn apply_forward_fill(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        if series.null_count() == 0 {
            return Ok(());
        }

        let mut last = None;
        let mut filled_count = 0usize;
        let values: Vec<Option<i64>> = series_to_millis(&series)?
            .into_iter()
            .map(|v| match v {
                Some(millis) => {
                    last = Some(millis);
                    Some(millis)
                }
                None => {
                    if last.is_some() {
                        filled_count += 1;
                    }
                    last
                }
            })
            .collect();
        df.replace(col_name, millis_series(col_name.into(), values)?)?;

        if filled_count > 0 {
            processing_steps.push(format!(
                "Forward filled {} missing values in '{}'",
                filled_count, col_name
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // apply_median_or_zero() tests
    // ========================================================================

    #[test]
    fn test_median_fill_below_threshold() {
        let mut df = df![
            "values" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).unwrap();

        let values = df.column("values").unwrap();
        assert_eq!(values.null_count(), 0);
        // Median of [1, 3, 5] = 3
        assert_eq!(values.get(1).unwrap().try_extract::<f64>().unwrap(), 3.0);
        assert!(steps[0].contains("median"));
    }

    #[test]
    fn test_zero_fill_above_threshold() {
        let mut df = df![
            "values" => [Some(10.0), None, None],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).unwrap();

        let values = df.column("values").unwrap();
        assert_eq!(values.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert!(steps[0].contains("zero"));
    }

    #[test]
    fn test_threshold_boundary_uses_median() {
        let mut df = df![
            "values" => [Some(4.0), None],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).unwrap();

        let values = df.column("values").unwrap();
        assert_eq!(values.get(1).unwrap().try_extract::<f64>().unwrap(), 4.0);
    }

    #[test]
    fn test_integer_column_keeps_storage() {
        let mut df = df![
            "qty" => [Some(1i64), Some(2), None, Some(4)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "qty", 0.5, &mut steps).unwrap();

        let qty = df.column("qty").unwrap();
        assert_eq!(qty.dtype(), &DataType::Int64);
        // Median of [1, 2, 4] = 2
        assert_eq!(qty.get(2).unwrap().try_extract::<i64>().unwrap(), 2);
    }

    #[test]
    fn test_all_null_column_filled_with_zero() {
        let mut df = df![
            "values" => [Option::<f64>::None, None],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).unwrap();
        assert_eq!(df.column("values").unwrap().null_count(), 0);
    }

    #[test]
    fn test_no_nulls_is_noop() {
        let mut df = df!["values" => [1.0, 2.0]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_missing_column_is_error() {
        let mut df = df!["other" => [1.0]].unwrap();
        let mut steps = Vec::new();
        assert!(
            StatisticalImputer::apply_median_or_zero(&mut df, "values", 0.5, &mut steps).is_err()
        );
    }

    // ========================================================================
    // apply_constant() / apply_forward_fill() tests
    // ========================================================================

    #[test]
    fn test_constant_fill() {
        let mut df = df![
            "region" => [Some("West"), None, Some("East")],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_constant(&mut df, "region", "Unknown", &mut steps).unwrap();

        let values: Vec<Option<&str>> = df
            .column("region")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some("West"), Some("Unknown"), Some("East")]);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_forward_fill_keeps_leading_null() {
        let series = millis_series("when".into(), vec![None, Some(1_000), None, Some(5_000), None])
            .unwrap();
        let mut df = DataFrame::new(vec![series.into_column()]).unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_forward_fill(&mut df, "when", &mut steps).unwrap();

        let filled = series_to_millis(df.column("when").unwrap().as_materialized_series()).unwrap();
        assert_eq!(
            filled,
            vec![None, Some(1_000), Some(1_000), Some(5_000), Some(5_000)]
        );
        assert!(steps[0].contains("Forward filled 2"));
    }
}
