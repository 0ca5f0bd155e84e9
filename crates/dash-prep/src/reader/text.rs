//! Plain-text reader.
//!
//! A text file whose sampled lines split into the same number of columns
//! (more than one) on a common delimiter is read as delimited text; anything else becomes a single
//! `text_content` column with one row per line.

use polars::prelude::*;
use tracing::debug;

use super::{RawTable, SourceFormat, SourceMetadata, TextLayout, delimited};
use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};

/// Name of the single column produced for unstructured text.
pub const TEXT_COLUMN: &str = "text_content";

/// Candidate delimiters in tie-break order.
const DELIMITERS: [char; 4] = ['\t', ',', ';', '|'];

pub fn read(bytes: &[u8], config: &ProcessorConfig) -> Result<RawTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProcessingError::MalformedContent(format!("invalid UTF-8: {}", e)))?;
    if text.trim().is_empty() {
        return Err(ProcessingError::EmptyOrUnreadable(
            "text file is empty".to_string(),
        ));
    }

    let sample: Vec<&str> = text
        .lines()
        .take(config.text_probe_lines)
        .map(str::trim)
        .collect();

    match sniff_delimiter(&sample) {
        Some((delimiter, columns)) if columns > 1 => {
            debug!(
                "Text detected as delimited by {:?} ({} columns)",
                delimiter, columns
            );
            let frame = delimited::parse(text, delimiter as u8, None)
                .map_err(ProcessingError::from_parse)?;
            let frame = delimited::relabel(frame, text, delimiter as u8)?;
            Ok(RawTable::new(
                frame,
                SourceFormat::PlainText,
                SourceMetadata::PlainText {
                    detected_as: TextLayout::Delimited,
                    delimiter: Some(delimiter.to_string()),
                    line_count: None,
                },
            ))
        }
        _ => {
            let lines: Vec<&str> = text.lines().collect();
            debug!("Text read as {} unstructured lines", lines.len());
            let line_count = lines.len();
            let frame = DataFrame::new(vec![Series::new(TEXT_COLUMN.into(), lines).into_column()])?;
            Ok(RawTable::new(
                frame,
                SourceFormat::PlainText,
                SourceMetadata::PlainText {
                    detected_as: TextLayout::PlainText,
                    delimiter: None,
                    line_count: Some(line_count),
                },
            )
            .into_unstructured())
        }
    }
}

/// Pick the delimiter yielding the most columns across the sampled lines.
///
/// A delimiter scores the column count of the first line, and only when
/// every other non-blank sampled line splits into the same count; otherwise
/// it scores one column. Ties keep the earliest candidate.
fn sniff_delimiter(sample: &[&str]) -> Option<(char, usize)> {
    let (first, rest) = sample.split_first()?;
    let mut best: Option<(char, usize)> = None;
    for delimiter in DELIMITERS {
        let width = first.split(delimiter).count();
        let consistent = rest
            .iter()
            .filter(|line| !line.is_empty())
            .all(|line| line.split(delimiter).count() == width);
        let columns = if consistent { width } else { 1 };
        if columns > best.map_or(0, |(_, c)| c) {
            best = Some((delimiter, columns));
        }
    }
    best
}
