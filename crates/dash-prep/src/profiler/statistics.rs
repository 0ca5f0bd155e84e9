//! Statistical analysis functions for column profiling.

use indexmap::IndexMap;
use polars::prelude::*;
use std::collections::HashSet;

use crate::config::ProcessorConfig;
use crate::types::{ColumnProfile, InferredType, NumericStats};
use crate::utils::{is_numeric_dtype, parse_number, series_to_f64, series_to_strings};

/// Computes per-column descriptive statistics. Never fails: an aggregate that
/// cannot be computed is left absent.
pub struct StatisticsCalculator;

impl StatisticsCalculator {
    /// Build the full profile of a column whose type is already inferred.
    pub fn profile_column(
        series: &Series,
        raw_name: &str,
        inferred_type: InferredType,
        config: &ProcessorConfig,
    ) -> ColumnProfile {
        let rendered = series_to_strings(series);
        let null_count = rendered.iter().filter(|v| v.is_none()).count();
        let unique_count = rendered
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .len();

        let numeric_stats = inferred_type
            .is_numeric()
            .then(|| Self::numeric_stats(&Self::numeric_values(series, &rendered)));

        let top_values = (inferred_type == InferredType::String
            || unique_count < config.categorical_unique_threshold)
            .then(|| Self::top_values(&rendered, config.top_values_limit));

        ColumnProfile {
            name: series.name().to_string(),
            raw_name: raw_name.to_string(),
            inferred_type,
            null_count,
            unique_count,
            numeric_stats,
            top_values,
        }
    }

    /// Mean, median, sample standard deviation, min and max of `values`.
    pub fn numeric_stats(values: &[f64]) -> NumericStats {
        let n = values.len();
        if n == 0 {
            return NumericStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        let std = (n >= 2).then(|| {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            variance.sqrt()
        });

        NumericStats {
            mean: finite(mean),
            median: finite(median),
            std: std.and_then(finite),
            min: sorted.first().copied().and_then(finite),
            max: sorted.last().copied().and_then(finite),
        }
    }

    /// Up to `limit` most frequent values with their counts, most frequent
    /// first; ties keep first-encountered order.
    pub fn top_values(values: &[Option<String>], limit: usize) -> IndexMap<String, usize> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        // sort_by is stable, which keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(value, count)| (value.to_string(), count))
            .collect()
    }

    /// Finite numeric values of a column, coercing strings when needed.
    fn numeric_values(series: &Series, rendered: &[Option<String>]) -> Vec<f64> {
        if is_numeric_dtype(series.dtype())
            && let Ok(values) = series_to_f64(series)
        {
            return values.into_iter().flatten().collect();
        }
        rendered
            .iter()
            .flatten()
            .filter_map(|v| parse_number(v))
            .collect()
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
