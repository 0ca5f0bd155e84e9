//! Cross-file schema unification for the analysis pass.
//!
//! Merges per-file analyses into one [`AnalysisResult`]: order-preserving
//! column union, per-category name sets, a unified schema and a short
//! natural-language summary.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::info;

use crate::profiler::ColumnNameNormalizer;
use crate::types::{AnalysisResult, FileAnalysis, TypeCategory, UnifiedColumn};

/// Summary used when no input could be analyzed.
pub const EMPTY_SUMMARY: &str = "No data could be analyzed";

/// Merges per-file schemas into the analysis result.
pub struct SchemaUnifier;

impl SchemaUnifier {
    /// Aggregate per-file analyses, in input order.
    ///
    /// Failed entries are kept in `files` and counted in `total_files` but
    /// contribute nothing else.
    pub fn unify(files: Vec<FileAnalysis>) -> AnalysisResult {
        let mut result = AnalysisResult {
            total_files: files.len(),
            ..Default::default()
        };

        let mut seen_columns = HashSet::new();
        let mut seen_by_category: IndexMap<TypeCategory, HashSet<String>> = IndexMap::new();
        let mut taken_stems = HashSet::new();

        for file in files.iter().filter(|f| f.is_success()) {
            result.total_rows += file.row_count;

            for column in file.schema.iter() {
                if seen_columns.insert(column.name.clone()) {
                    result.columns.push(column.name.clone());
                }

                let category = column.inferred_type.category();
                if seen_by_category
                    .entry(category)
                    .or_default()
                    .insert(column.name.clone())
                {
                    match category {
                        TypeCategory::Numeric => result.numeric_columns.push(column.name.clone()),
                        TypeCategory::Date => result.date_columns.push(column.name.clone()),
                        TypeCategory::Text => result.text_columns.push(column.name.clone()),
                    }
                }

                result
                    .data_types
                    .insert(column.name.clone(), column.inferred_type);

                let unified = UnifiedColumn {
                    data_type: column.inferred_type,
                    category,
                };
                match result.schema.entry(column.name.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(unified);
                    }
                    Entry::Occupied(mut entry) => {
                        if category_rank(category) < category_rank(entry.get().category) {
                            entry.insert(unified);
                        }
                    }
                }
            }

            let stem = ColumnNameNormalizer::disambiguate(&file_stem(&file.filename), &taken_stems);
            taken_stems.insert(stem.clone());
            result.sample_data.insert(stem, file.sample_rows.clone());
        }

        result.summary = Self::summarize(&result);
        result.files = files;

        info!(
            "Unified {} of {} files: {} rows, {} columns",
            result.successful_files().count(),
            result.total_files,
            result.total_rows,
            result.columns.len()
        );
        result
    }

    /// Human-readable description of an aggregated analysis.
    pub fn summarize(result: &AnalysisResult) -> String {
        if result.columns.is_empty() && result.total_rows == 0 {
            return EMPTY_SUMMARY.to_string();
        }

        let mut summary = format!(
            "Analyzed {} containing {} total rows and {} unique columns. ",
            plural(result.total_files, "file"),
            group_thousands(result.total_rows),
            result.columns.len()
        );
        summary.push_str(&format!(
            "Found {}, {}, and {}. ",
            plural(result.numeric_columns.len(), "numeric column"),
            plural(result.date_columns.len(), "date column"),
            plural(result.text_columns.len(), "text column")
        ));

        if !result.numeric_columns.is_empty() {
            let keys: Vec<&str> = result
                .numeric_columns
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            summary.push_str(&format!("Key numeric fields: {}. ", keys.join(", ")));
        }
        if !result.date_columns.is_empty() {
            let dates: Vec<&str> = result
                .date_columns
                .iter()
                .take(2)
                .map(String::as_str)
                .collect();
            summary.push_str(&format!("Date fields: {}. ", dates.join(", ")));
        }

        summary.push_str("Data is ready for dashboard creation.");
        summary
    }
}

/// Numeric wins over date, date over text.
fn category_rank(category: TypeCategory) -> u8 {
    match category {
        TypeCategory::Numeric => 0,
        TypeCategory::Date => 1,
        TypeCategory::Text => 2,
    }
}

pub(crate) fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// `1234567` → `1,234,567`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::types::{ColumnProfile, FileStatus, InferredType, TableSchema};
    use pretty_assertions::assert_eq;

    fn column(name: &str, inferred_type: InferredType) -> ColumnProfile {
        ColumnProfile {
            name: name.to_string(),
            raw_name: name.to_string(),
            inferred_type,
            null_count: 0,
            unique_count: 0,
            numeric_stats: None,
            top_values: None,
        }
    }

    fn file(filename: &str, rows: usize, columns: Vec<ColumnProfile>) -> FileAnalysis {
        let schema = TableSchema::new(columns);
        FileAnalysis {
            filename: filename.to_string(),
            status: FileStatus::Success,
            file_type: Some(".csv".to_string()),
            row_count: rows,
            columns: schema.names(),
            original_columns: schema.raw_names(),
            schema,
            sample_rows: Vec::new(),
            metadata: None,
            error: None,
            error_code: None,
        }
    }

    #[test]
    fn test_union_preserves_first_appearance() {
        let result = SchemaUnifier::unify(vec![
            file(
                "a.csv",
                2,
                vec![column("Date", InferredType::Datetime), column("Sales", InferredType::Int)],
            ),
            file(
                "b.csv",
                3,
                vec![column("Region", InferredType::String), column("Sales", InferredType::Float)],
            ),
        ]);

        assert_eq!(result.columns, vec!["Date", "Sales", "Region"]);
        assert_eq!(result.total_rows, 5);
        assert_eq!(result.numeric_columns, vec!["Sales"]);
        assert_eq!(result.data_types["Sales"], InferredType::Float);
        assert_eq!(result.sample_data.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_conflicting_categories_appear_in_both_sets() {
        let result = SchemaUnifier::unify(vec![
            file("a.csv", 1, vec![column("code", InferredType::String)]),
            file("b.csv", 1, vec![column("code", InferredType::Int)]),
        ]);

        assert_eq!(result.numeric_columns, vec!["code"]);
        assert_eq!(result.text_columns, vec!["code"]);
        assert_eq!(result.schema["code"].category, TypeCategory::Numeric);
        assert_eq!(result.schema["code"].data_type, InferredType::Int);
    }

    #[test]
    fn test_failed_files_counted_not_merged() {
        let error = ProcessingError::FileNotFound("missing.csv".into());
        let result = SchemaUnifier::unify(vec![
            FileAnalysis::failed("missing.csv", &error),
            file("ok.csv", 4, vec![column("Sales", InferredType::Int)]),
        ]);

        assert_eq!(result.total_files, 2);
        assert_eq!(result.total_rows, 4);
        assert_eq!(result.files.len(), 2);
        assert_eq!(result.failed_files().count(), 1);
        assert!(result.summary.starts_with("Analyzed 2 files"));
    }

    #[test]
    fn test_summary_text() {
        let result = SchemaUnifier::unify(vec![file(
            "sales.csv",
            1234,
            vec![
                column("Date", InferredType::Datetime),
                column("Region", InferredType::String),
                column("Sales", InferredType::Int),
            ],
        )]);

        assert_eq!(
            result.summary,
            "Analyzed 1 file containing 1,234 total rows and 3 unique columns. \
             Found 1 numeric column, 1 date column, and 1 text column. \
             Key numeric fields: Sales. Date fields: Date. \
             Data is ready for dashboard creation."
        );
    }

    #[test]
    fn test_empty_summary() {
        let result = SchemaUnifier::unify(Vec::new());
        assert_eq!(result.summary, EMPTY_SUMMARY);
        assert_eq!(result.total_files, 0);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
