//! Shared utilities for the ingestion pipeline.
//!
//! This module contains the value-level helpers used by the readers, the
//! profiler, the cleaner and the exporter so that every stage agrees on what
//! counts as a number, a timestamp, a boolean or a missing value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// The storage type used for every timestamp column.
pub fn datetime_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Optionally signed decimal literal with at most one decimal point.
static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("Invalid regex: numeric literal"));

/// Markers read as missing values by the delimited-text parser.
pub const NULL_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Tokens accepted by the boolean inference rule (lowercase).
pub const BOOLEAN_TOKENS: [&str; 6] = ["true", "false", "1", "0", "yes", "no"];

/// Check whether `s` is a plain numeric literal such as `12`, `-3.5` or `.5`.
pub fn is_numeric_literal(s: &str) -> bool {
    NUMERIC_LITERAL.is_match(s.trim())
}

/// Parse a string into a finite number.
///
/// Accepts anything Rust's float parser accepts (including exponents) but
/// rejects NaN and infinities.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a boolean token (`true`/`yes`/`1`, `false`/`no`/`0`), case-insensitively.
pub fn parse_boolean(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

const DATETIME_FORMATS: [&str; 14] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%d.%m.%Y",
    "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%d-%b-%Y",
];

/// Parse a timestamp using a generic set of layouts.
///
/// Tries RFC 3339, RFC 2822, then common date-time and date layouts. Offsets
/// are normalized to UTC. Purely numeric strings are never timestamps.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() || is_numeric_literal(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(trimmed, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Render a float the way the profiler reports values: whole numbers keep a
/// single decimal (`120.0`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a timestamp as ISO 8601, with fractional seconds only when present.
pub fn format_datetime_iso(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Convert epoch milliseconds into a naive UTC timestamp.
pub fn millis_to_datetime(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Convert a naive UTC timestamp into epoch milliseconds.
pub fn datetime_to_millis(value: &NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

// =============================================================================
// Series Access Utilities
// =============================================================================

/// Read any series as optional strings.
///
/// Dispatches on the storage type so that numbers and timestamps render
/// consistently; unknown types fall back to the polars display form.
pub fn series_to_strings(series: &Series) -> Vec<Option<String>> {
    let dtype = series.dtype();
    let rendered: PolarsResult<Vec<Option<String>>> = if matches!(dtype, DataType::String) {
        series
            .str()
            .map(|ca| ca.into_iter().map(|v| v.map(str::to_string)).collect())
    } else if matches!(dtype, DataType::Boolean) {
        series
            .bool()
            .map(|ca| ca.into_iter().map(|v| v.map(|b| b.to_string())).collect())
    } else if is_integer_dtype(dtype) {
        series.cast(&DataType::Int64).and_then(|s| {
            s.i64()
                .map(|ca| ca.into_iter().map(|v| v.map(|n| n.to_string())).collect())
        })
    } else if is_float_dtype(dtype) {
        series_to_f64(series).map(|values| values.into_iter().map(|v| v.map(format_float)).collect())
    } else if is_datetime_dtype(dtype) {
        series_to_millis(series).map(|values| {
            values
                .into_iter()
                .map(|v| v.and_then(millis_to_datetime).map(|dt| format_datetime(&dt)))
                .collect()
        })
    } else {
        Err(PolarsError::ComputeError("unsupported dtype".into()))
    };

    rendered.unwrap_or_else(|_| {
        (0..series.len())
            .map(|i| {
                series
                    .get(i)
                    .ok()
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
            })
            .collect()
    })
}

/// Read a numeric series as optional finite floats.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|f| f.is_finite()))
        .collect())
}

/// Read a date or datetime series as optional epoch milliseconds.
pub fn series_to_millis(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let cast = series.cast(&datetime_dtype())?.cast(&DataType::Int64)?;
    Ok(cast.i64()?.into_iter().collect())
}

/// Build a millisecond timestamp series from epoch milliseconds.
pub fn millis_series(name: PlSmallStr, values: Vec<Option<i64>>) -> PolarsResult<Series> {
    Series::new(name, values).cast(&datetime_dtype())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_dtype_helpers() {
        assert!(is_integer_dtype(&DataType::Int64));
        assert!(is_integer_dtype(&DataType::UInt8));
        assert!(is_float_dtype(&DataType::Float32));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::Boolean));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&datetime_dtype()));
    }

    #[test]
    fn test_is_numeric_literal() {
        assert!(is_numeric_literal("42"));
        assert!(is_numeric_literal("-3.5"));
        assert!(is_numeric_literal("+.5"));
        assert!(is_numeric_literal(" 7. "));
        assert!(!is_numeric_literal("1e5"));
        assert!(!is_numeric_literal("1.2.3"));
        assert!(!is_numeric_literal("abc"));
        assert!(!is_numeric_literal(""));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("10.5"), Some(10.5));
        assert_eq!(parse_number(" -2 "), Some(-2.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("bad"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_boolean("Yes"), Some(true));
        assert_eq!(parse_boolean("TRUE"), Some(true));
        assert_eq!(parse_boolean("0"), Some(false));
        assert_eq!(parse_boolean("no"), Some(false));
        assert_eq!(parse_boolean("maybe"), None);
    }

    #[test]
    fn test_parse_datetime_layouts() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(parse_datetime("2024-01-02"), Some(midnight));
        assert_eq!(parse_datetime("2024/01/02"), Some(midnight));
        assert_eq!(parse_datetime("01/02/2024"), Some(midnight));
        assert_eq!(parse_datetime("Jan 02, 2024"), Some(midnight));
        assert_eq!(parse_datetime("2024-01-02T00:00:00Z"), Some(midnight));
        assert_eq!(
            parse_datetime("2024-01-02 13:45:10"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(13, 45, 10)
        );
    }

    #[test]
    fn test_parse_datetime_rejects_non_dates() {
        assert_eq!(parse_datetime("120"), None);
        assert_eq!(parse_datetime("3.14"), None);
        assert_eq!(parse_datetime("West"), None);
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(120.0), "120.0");
        assert_eq!(format_float(10.5), "10.5");
        assert_eq!(format_float(-3.0), "-3.0");
    }

    #[test]
    fn test_millis_roundtrip() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_milli_opt(8, 30, 0, 250)
            .unwrap();
        let millis = datetime_to_millis(&dt);
        assert_eq!(millis_to_datetime(millis), Some(dt));
        assert_eq!(format_datetime_iso(&dt), "2024-03-15T08:30:00.250");
        assert_eq!(format_datetime(&dt), "2024-03-15 08:30:00");
    }

    #[test]
    fn test_series_to_strings_dispatch() {
        let ints = Series::new("a".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(
            series_to_strings(&ints),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );

        let floats = Series::new("b".into(), &[120.0f64, 2.5]);
        assert_eq!(
            series_to_strings(&floats),
            vec![Some("120.0".to_string()), Some("2.5".to_string())]
        );

        let bools = Series::new("c".into(), &[true, false]);
        assert_eq!(
            series_to_strings(&bools),
            vec![Some("true".to_string()), Some("false".to_string())]
        );
    }

    #[test]
    fn test_millis_series_is_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series =
            millis_series("when".into(), vec![Some(datetime_to_millis(&dt)), None]).unwrap();

        assert!(is_datetime_dtype(series.dtype()));
        assert_eq!(
            series_to_strings(&series),
            vec![Some("2024-01-01 00:00:00".to_string()), None]
        );
        assert_eq!(
            series_to_millis(&series).unwrap(),
            vec![Some(datetime_to_millis(&dt)), None]
        );
    }
}
