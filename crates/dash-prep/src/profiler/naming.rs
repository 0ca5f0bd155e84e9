//! Column label normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex: non-word"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace"));
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("Invalid regex: underscores"));

/// Fallback name for labels that normalize to nothing.
pub const UNNAMED_COLUMN: &str = "unnamed_column";

/// Turns raw column labels into safe, unique identifiers.
pub struct ColumnNameNormalizer;

impl ColumnNameNormalizer {
    /// Normalize a single label. Pure and idempotent.
    ///
    /// ```rust,ignore
    /// assert_eq!(ColumnNameNormalizer::normalize("Unit Price ($)"), "Unit_Price");
    /// assert_eq!(ColumnNameNormalizer::normalize("2024 total"), "col_2024_total");
    /// ```
    pub fn normalize(raw: &str) -> String {
        let cleaned = NON_WORD.replace_all(raw, "_");
        let cleaned = WHITESPACE.replace_all(&cleaned, "_");
        let cleaned = UNDERSCORES.replace_all(&cleaned, "_");
        let cleaned = cleaned.trim_matches('_');

        match cleaned.chars().next() {
            None => UNNAMED_COLUMN.to_string(),
            Some(first) if !first.is_alphabetic() => format!("col_{}", cleaned),
            Some(_) => cleaned.to_string(),
        }
    }

    /// Normalize every label of a table, suffixing repeats with `_2`, `_3`, ...
    ///
    /// A suffix already taken by another column is skipped, so the result
    /// never contains duplicates.
    pub fn normalize_all<S: AsRef<str>>(raw_labels: &[S]) -> Vec<String> {
        let mut taken: HashSet<String> = HashSet::with_capacity(raw_labels.len());
        raw_labels
            .iter()
            .map(|raw| {
                let base = Self::normalize(raw.as_ref());
                let name = Self::disambiguate(&base, &taken);
                taken.insert(name.clone());
                name
            })
            .collect()
    }

    /// First of `base`, `base_2`, `base_3`, ... not present in `taken`.
    pub fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
        if !taken.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}
