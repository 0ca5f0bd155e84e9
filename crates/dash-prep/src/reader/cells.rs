//! Cell-level values shared by the spreadsheet and record readers.
//!
//! Both formats hand back loosely typed cells; a column's storage type is
//! chosen from the kinds of its non-null cells.

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::utils::{datetime_to_millis, format_datetime, format_float, millis_series};

/// One loosely typed value read from a workbook cell or a JSON record.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    fn render(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(format_float(*f)),
            Cell::Text(s) => Some(s.clone()),
            Cell::DateTime(dt) => Some(format_datetime(dt)),
        }
    }
}

/// Build a column from cells.
///
/// Storage is chosen from the non-null cells:
/// all booleans → `Boolean`; all integers → `Int64`; integers and floats →
/// `Float64` (or `Int64` when `whole_floats_as_int` is set and every float is
/// whole); all timestamps → millisecond `Datetime`; anything else → `String`.
pub fn build_series(name: &str, cells: &[Cell], whole_floats_as_int: bool) -> PolarsResult<Series> {
    let present: Vec<&Cell> = cells.iter().filter(|c| !c.is_null()).collect();

    if present.is_empty() {
        let values: Vec<Option<String>> = vec![None; cells.len()];
        return Ok(Series::new(name.into(), values));
    }

    if present.iter().all(|c| matches!(c, Cell::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Cell::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), values));
    }

    let all_numeric = present
        .iter()
        .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_)));
    if all_numeric {
        let integral = present.iter().all(|c| match c {
            Cell::Int(_) => true,
            Cell::Float(f) => {
                whole_floats_as_int
                    && f.is_finite()
                    && f.fract() == 0.0
                    && f.abs() < i64::MAX as f64
            }
            _ => false,
        });

        if integral {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(i) => Some(*i),
                    Cell::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            return Ok(Series::new(name.into(), values));
        }

        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(i) => Some(*i as f64),
                Cell::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), values));
    }

    if present.iter().all(|c| matches!(c, Cell::DateTime(_))) {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::DateTime(dt) => Some(datetime_to_millis(dt)),
                _ => None,
            })
            .collect();
        return millis_series(name.into(), values);
    }

    let values: Vec<Option<String>> = cells.iter().map(Cell::render).collect();
    Ok(Series::new(name.into(), values))
}
