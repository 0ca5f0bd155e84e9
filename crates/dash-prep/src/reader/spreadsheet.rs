//! Spreadsheet reader for `.xlsx` and `.xls` workbooks.

use calamine::{Data, DataType as CellValue, Range, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use super::cells::{Cell, build_series};
use super::{RawTable, SourceFormat, SourceMetadata, unique_labels};
use crate::error::{ProcessingError, Result};

/// Read the main sheet of a workbook.
///
/// The main sheet is the one with the most columns; ties keep the earliest
/// sheet. The first row of the sheet's used range is the header.
pub fn read(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        ProcessingError::MalformedContent(format!("failed to open workbook: {}", e))
    })?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook.worksheet_range(name).map_err(|e| {
            ProcessingError::MalformedContent(format!("failed to read sheet '{}': {}", name, e))
        })?;
        debug!("Sheet '{}' has {} columns", name, range.width());
        sheets.push((name.clone(), range));
    }

    let Some(index) = main_sheet_index(&sheets) else {
        return Err(ProcessingError::EmptyOrUnreadable(
            "workbook has no sheets".to_string(),
        ));
    };
    let (main_sheet, range) = sheets.swap_remove(index);
    debug!("Selected main sheet '{}'", main_sheet);

    let frame = range_to_frame(&range)?;
    Ok(RawTable::new(
        frame,
        SourceFormat::Spreadsheet,
        SourceMetadata::Spreadsheet {
            sheet_names,
            main_sheet,
        },
    ))
}

/// Convert a used range into a frame, taking the first row as the header.
pub(crate) fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(ProcessingError::EmptyOrUnreadable(
            "sheet is empty".to_string(),
        ));
    };

    let labels = header_labels(header);
    let mut columns: Vec<Vec<Cell>> =
        vec![Vec::with_capacity(range.height().saturating_sub(1)); labels.len()];

    for row in rows {
        for (index, value) in row.iter().enumerate().take(labels.len()) {
            columns[index].push(sheet_cell(value));
        }
    }

    let columns = labels
        .iter()
        .zip(columns.iter())
        .map(|(label, cells)| build_series(label, cells, true).map(|s| s.into_column()))
        .collect::<PolarsResult<Vec<_>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Index of the sheet with the most columns; the earliest sheet wins a tie.
fn main_sheet_index(sheets: &[(String, Range<Data>)]) -> Option<usize> {
    sheets
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, usize)>, (index, (_, range))| match best {
            Some((_, width)) if width >= range.width() => best,
            _ => Some((index, range.width())),
        })
        .map(|(index, _)| index)
}

fn header_labels(header: &[Data]) -> Vec<String> {
    unique_labels(header.iter().map(|value| match value {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }))
}

fn sheet_cell(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        other => other
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(other.to_string())),
    }
}
