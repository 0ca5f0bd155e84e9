//! Type inference logic for column analysis.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. no non-null values → `string`
//! 2. integer storage → `int`, float storage → `float`
//! 3. date/datetime storage, or every sampled value parses as a timestamp → `datetime`
//! 4. every sampled value is a plain numeric literal → `float`
//! 5. the first distinct values are all boolean tokens → `bool`
//! 6. otherwise → `string`

use indexmap::IndexSet;
use polars::prelude::*;

use crate::config::ProcessorConfig;
use crate::types::InferredType;
use crate::utils::{
    BOOLEAN_TOKENS, is_datetime_dtype, is_float_dtype, is_integer_dtype, is_numeric_literal,
    parse_datetime, series_to_strings,
};

/// Assigns a semantic type to a column. Never fails.
pub struct TypeInferencer;

impl TypeInferencer {
    pub fn infer(series: &Series, config: &ProcessorConfig) -> InferredType {
        if series.len() == series.null_count() {
            return InferredType::String;
        }

        let dtype = series.dtype();
        if is_integer_dtype(dtype) {
            return InferredType::Int;
        }
        if is_float_dtype(dtype) {
            return InferredType::Float;
        }
        if is_datetime_dtype(dtype) {
            return InferredType::Datetime;
        }

        let values: Vec<String> = series_to_strings(series).into_iter().flatten().collect();
        if values.is_empty() {
            return InferredType::String;
        }
        let sample = &values[..values.len().min(config.inference_sample_size)];

        if sample.iter().all(|v| parse_datetime(v).is_some()) {
            return InferredType::Datetime;
        }

        if sample.iter().all(|v| is_numeric_literal(v)) {
            return InferredType::Float;
        }

        if is_boolean_column(&values, config.boolean_probe_size) {
            return InferredType::Bool;
        }

        InferredType::String
    }
}

/// Whether the first `probe_size` distinct values are all boolean tokens.
fn is_boolean_column(values: &[String], probe_size: usize) -> bool {
    let mut distinct: IndexSet<&str> = IndexSet::new();
    for value in values {
        distinct.insert(value.as_str());
        if distinct.len() >= probe_size {
            break;
        }
    }

    distinct
        .iter()
        .all(|v| BOOLEAN_TOKENS.contains(&v.trim().to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::millis_series;

    fn infer(series: Series) -> InferredType {
        TypeInferencer::infer(&series, &ProcessorConfig::default())
    }

    #[test]
    fn test_all_null_is_string() {
        let series = Series::new("x".into(), &[None::<i64>, None]);
        assert_eq!(infer(series), InferredType::String);
    }

    #[test]
    fn test_typed_storage() {
        assert_eq!(infer(Series::new("x".into(), &[1i64, 2, 3])), InferredType::Int);
        assert_eq!(infer(Series::new("x".into(), &[1i32, 2])), InferredType::Int);
        assert_eq!(infer(Series::new("x".into(), &[1.5f64, 2.0])), InferredType::Float);
        assert_eq!(
            infer(millis_series("x".into(), vec![Some(0), None]).unwrap()),
            InferredType::Datetime
        );
    }

    #[test]
    fn test_datetime_strings() {
        let series = Series::new("d".into(), &[Some("2024-01-01"), None, Some("2024-01-02")]);
        assert_eq!(infer(series), InferredType::Datetime);
    }

    #[test]
    fn test_numeric_strings_are_float() {
        let series = Series::new("n".into(), &["12", "-3.5", ".5"]);
        assert_eq!(infer(series), InferredType::Float);
    }

    #[test]
    fn test_datetime_rule_precedes_numeric_rule() {
        // Numeric strings are never timestamps, so the numeric rule decides
        let series = Series::new("n".into(), &["20240101", "20240102"]);
        assert_eq!(infer(series), InferredType::Float);
    }

    #[test]
    fn test_boolean_tokens() {
        let series = Series::new("b".into(), &["Yes", "no", "YES", "No"]);
        assert_eq!(infer(series), InferredType::Bool);

        let series = Series::new("b".into(), &[true, false]);
        assert_eq!(infer(series), InferredType::Bool);
    }

    #[test]
    fn test_string_fallback() {
        let series = Series::new("s".into(), &["West", "East", "West"]);
        assert_eq!(infer(series), InferredType::String);

        let series = Series::new("s".into(), &["10.5", "bad"]);
        assert_eq!(infer(series), InferredType::String);
    }

    #[test]
    fn test_boolean_probe_is_bounded() {
        // Only the first distinct values are examined
        let config = ProcessorConfig::builder().boolean_probe_size(2).build().unwrap();
        let series = Series::new("b".into(), &["yes", "no", "maybe"]);
        assert_eq!(TypeInferencer::infer(&series, &config), InferredType::Bool);
        assert_eq!(infer(series), InferredType::String);
    }

    #[test]
    fn test_sample_is_bounded() {
        let config = ProcessorConfig::builder()
            .inference_sample_size(2)
            .build()
            .unwrap();
        let series = Series::new("d".into(), &["2024-01-01", "2024-01-02", "later"]);
        assert_eq!(TypeInferencer::infer(&series, &config), InferredType::Datetime);
    }
}
