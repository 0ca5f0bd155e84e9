//! Type conversion functions for data cleaning.
//!
//! Conversions never fail on content: a value that cannot be converted
//! becomes null.

use polars::prelude::*;

use crate::utils::{
    datetime_to_millis, is_datetime_dtype, is_numeric_dtype, parse_boolean, parse_datetime,
    parse_number, series_to_f64, series_to_millis, series_to_strings,
};

/// Values of any column as finite floats.
pub(crate) fn to_numeric(series: &Series) -> Vec<Option<f64>> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype)
        && let Ok(values) = series_to_f64(series)
    {
        return values;
    }
    if matches!(dtype, DataType::Boolean)
        && let Ok(ca) = series.bool()
    {
        return ca
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect();
    }
    if is_datetime_dtype(dtype) {
        return vec![None; series.len()];
    }

    series_to_strings(series)
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_number))
        .collect()
}

/// Values of any column as epoch milliseconds.
pub(crate) fn to_datetime_millis(series: &Series) -> Vec<Option<i64>> {
    if is_datetime_dtype(series.dtype())
        && let Ok(values) = series_to_millis(series)
    {
        return values;
    }
    if matches!(series.dtype(), DataType::String) {
        return series_to_strings(series)
            .into_iter()
            .map(|v| {
                v.as_deref()
                    .and_then(parse_datetime)
                    .map(|dt| datetime_to_millis(&dt))
            })
            .collect();
    }

    vec![None; series.len()]
}

/// Values of any column as booleans (`true`/`yes`/`1`, `false`/`no`/`0`).
pub(crate) fn to_boolean(series: &Series) -> Vec<Option<bool>> {
    if matches!(series.dtype(), DataType::Boolean)
        && let Ok(ca) = series.bool()
    {
        return ca.into_iter().collect();
    }

    series_to_strings(series)
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_boolean))
        .collect()
}

/// Share of a column's non-null values that survived a conversion.
pub(crate) fn coercion_ratio<T>(original_non_null: usize, converted: &[Option<T>]) -> f64 {
    if original_non_null == 0 {
        return 0.0;
    }
    converted.iter().filter(|v| v.is_some()).count() as f64 / original_non_null as f64
}
