//! Delimited-text reader with encoding and delimiter probing.

use encoding_rs::Encoding;
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions, NullValues};
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;

use super::{RawTable, SourceFormat, SourceMetadata, unique_labels};
use crate::config::ProcessorConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::NULL_MARKERS;

/// Encodings probed in priority order: reported name and WHATWG label.
const ENCODINGS: [(&str, &str); 4] = [
    ("utf-8", "utf-8"),
    ("latin-1", "latin1"),
    ("iso-8859-1", "iso-8859-1"),
    ("cp1252", "cp1252"),
];

/// Delimiters probed in priority order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Read delimited text.
///
/// Every encoding/delimiter pair is tried on the first
/// `config.csv_probe_rows` rows; the first pair yielding more than one column
/// is used to re-read the whole file. When no pair qualifies the file is read
/// as UTF-8 with commas, and any failure is raised.
pub fn read(bytes: &[u8], config: &ProcessorConfig) -> Result<RawTable> {
    for (name, label) in ENCODINGS {
        let Some(text) = decode(bytes, label) else {
            debug!("Encoding {} rejected", name);
            continue;
        };

        for delimiter in DELIMITERS {
            let prefix = leading_lines(&text, config.csv_probe_rows);
            match parse(prefix, delimiter, Some(config.csv_probe_rows)) {
                Ok(sample) if sample.width() > 1 => {
                    debug!(
                        "Detected encoding {} with delimiter {:?} ({} columns)",
                        name,
                        delimiter as char,
                        sample.width()
                    );
                    let frame = parse(&text, delimiter, None).map_err(ProcessingError::from_parse)?;
                    return table(frame, &text, name, delimiter);
                }
                Ok(_) => {}
                Err(e) => debug!(
                    "Parsing as {} / {:?} failed: {}",
                    name, delimiter as char, e
                ),
            }
        }
    }

    debug!("No encoding and delimiter produced multiple columns, falling back to utf-8 / ','");
    let text = decode(bytes, "utf-8").ok_or_else(|| {
        ProcessingError::MalformedContent("content is not valid in any probed encoding".to_string())
    })?;
    let frame = parse(&text, b',', None).map_err(ProcessingError::from_parse)?;
    table(frame, &text, "utf-8", b',')
}

/// Decode `bytes`, stripping a byte-order mark. Returns `None` when the
/// encoding is unknown or the content has malformed sequences.
fn decode<'a>(bytes: &'a [u8], label: &str) -> Option<Cow<'a, str>> {
    let encoding = Encoding::for_label(label.as_bytes())?;
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    (!had_errors).then_some(text)
}

/// The header line plus the first `rows` data lines of `text`.
fn leading_lines(text: &str, rows: usize) -> &str {
    match text.match_indices('\n').nth(rows) {
        Some((end, _)) => &text[..=end],
        None => text,
    }
}

fn options(delimiter: u8) -> CsvReadOptions {
    let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|m| (*m).into()).collect());

    CsvReadOptions::default().with_parse_options(
        CsvParseOptions::default()
            .with_separator(delimiter)
            .with_quote_char(Some(b'"'))
            .with_null_values(Some(null_values)),
    )
}

/// Parse decoded text with a given delimiter, optionally bounded in rows.
pub(crate) fn parse(text: &str, delimiter: u8, n_rows: Option<usize>) -> PolarsResult<DataFrame> {
    options(delimiter)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_n_rows(n_rows)
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
}

/// Header fields of `text` as written, unquoted, blanks as `None`.
fn header_fields(text: &str, delimiter: u8) -> PolarsResult<Vec<Option<String>>> {
    let header = options(delimiter)
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_n_rows(Some(1))
        .into_reader_with_file_handle(Cursor::new(leading_lines(text, 0).as_bytes().to_vec()))
        .finish()?;

    header
        .get_columns()
        .iter()
        .map(|column| Ok(column.str()?.get(0).map(str::to_string)))
        .collect()
}

/// Rename the parsed columns after the header line, with blanks and
/// repeats labelled the same way as spreadsheet headers.
pub(crate) fn relabel(frame: DataFrame, text: &str, delimiter: u8) -> Result<DataFrame> {
    let labels = unique_labels(header_fields(text, delimiter)?);
    if labels.len() != frame.width() {
        debug!(
            "Header has {} fields but {} columns were parsed, keeping parser labels",
            labels.len(),
            frame.width()
        );
        return Ok(frame);
    }

    let columns = frame
        .take_columns()
        .into_iter()
        .zip(labels)
        .map(|(column, label)| column.with_name(label.into()))
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn table(frame: DataFrame, text: &str, encoding: &str, delimiter: u8) -> Result<RawTable> {
    let frame = relabel(frame, text, delimiter)?;
    Ok(RawTable::new(
        frame,
        SourceFormat::Delimited,
        SourceMetadata::Delimited {
            encoding: encoding.to_string(),
            delimiter: (delimiter as char).to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(table: &RawTable) -> (String, String) {
        match table.metadata() {
            SourceMetadata::Delimited {
                encoding,
                delimiter,
            } => (encoding.clone(), delimiter.clone()),
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_comma_utf8() {
        let table = read(
            b"Date,Region,Sales\n2024-01-01,West,120\n2024-01-02,East,95\n",
            &ProcessorConfig::default(),
        )
        .unwrap();

        assert_eq!(table.raw_labels(), vec!["Date", "Region", "Sales"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(metadata(&table), ("utf-8".to_string(), ",".to_string()));
        assert_eq!(table.frame().column("Sales").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_semicolon_detected() {
        let table = read(b"a;b;c\n1;2;3\n4;5;6\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.raw_labels(), vec!["a", "b", "c"]);
        assert_eq!(metadata(&table).1, ";");
    }

    #[test]
    fn test_pipe_detected() {
        let table = read(b"x|y\n1|2\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(metadata(&table).1, "|");
    }

    #[test]
    fn test_latin1_fallback_encoding() {
        // 0xE9 is 'é' in latin-1 and invalid as a lone UTF-8 byte
        let bytes = b"name,city\nRen\xe9,Paris\n";
        let table = read(bytes, &ProcessorConfig::default()).unwrap();
        let (encoding, delimiter) = metadata(&table);
        assert_eq!(encoding, "latin-1");
        assert_eq!(delimiter, ",");

        let names: Vec<Option<&str>> = table
            .frame()
            .column("name")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec![Some("René")]);
    }

    #[test]
    fn test_bom_is_removed() {
        let table = read(b"\xef\xbb\xbfid,value\n1,2\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.raw_labels(), vec!["id", "value"]);
    }

    #[test]
    fn test_single_column_falls_back() {
        let table = read(b"only\n1\n2\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.raw_labels(), vec!["only"]);
        assert_eq!(metadata(&table), ("utf-8".to_string(), ",".to_string()));
    }

    #[test]
    fn test_duplicate_and_blank_headers_relabelled() {
        let table = read(b"a,a,,b\n1,2,3,4\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.raw_labels(), vec!["a", "a.1", "Unnamed: 2", "b"]);
        assert_eq!(table.frame().column("a.1").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_quoted_header_keeps_delimiter_inside() {
        let table = read(b"\"City, State\",Sales\nAustin,5\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.raw_labels(), vec!["City, State", "Sales"]);
    }

    #[test]
    fn test_leading_lines_bounds_text() {
        let text = "h1,h2\n1,2\n3,4\n5,6\n";
        assert_eq!(leading_lines(text, 0), "h1,h2\n");
        assert_eq!(leading_lines(text, 2), "h1,h2\n1,2\n3,4\n");
        assert_eq!(leading_lines(text, 10), text);
    }

    #[test]
    fn test_delimiter_detected_from_prefix_of_long_input() {
        let mut bytes = b"id;score\n".to_vec();
        for i in 0..5_000 {
            bytes.extend_from_slice(format!("{};{}\n", i, i % 7).as_bytes());
        }
        let config = ProcessorConfig {
            csv_probe_rows: 10,
            ..ProcessorConfig::default()
        };

        let table = read(&bytes, &config).unwrap();
        assert_eq!(metadata(&table).1, ";");
        assert_eq!(table.row_count(), 5_000);
    }

    #[test]
    fn test_null_markers() {
        let table = read(b"a,b\n1,N/A\n2,\n3,null\n4,x\n", &ProcessorConfig::default()).unwrap();
        assert_eq!(table.frame().column("b").unwrap().null_count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let err = read(b"", &ProcessorConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::EmptyOrUnreadable(_) | ProcessingError::MalformedContent(_)
        ));
    }
}
