//! Heuristic join detection between processed tables.

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{Cardinality, ProcessedTable, Relationship};

/// Detects probable joins from shared key-like column names.
pub struct RelationshipDetector;

impl RelationshipDetector {
    /// One relationship per table pair sharing a key-like column.
    ///
    /// Pairs are visited in insertion order (`i < j`); the first shared
    /// column of the first table whose lowercase name contains one of
    /// `keywords` becomes the join column.
    pub fn detect(
        tables: &IndexMap<String, ProcessedTable>,
        keywords: &[String],
    ) -> Vec<Relationship> {
        let entries: Vec<(&String, &ProcessedTable)> = tables.iter().collect();
        let mut relationships = Vec::new();

        for (i, (from_name, from)) in entries.iter().enumerate() {
            for (to_name, to) in entries.iter().skip(i + 1) {
                let candidate = from.column_names().find(|column| {
                    to.column_names().any(|other| other == *column)
                        && Self::is_candidate_key(column, keywords)
                });

                if let Some(column) = candidate {
                    debug!(
                        "Relationship {}.{} -> {}.{}",
                        from_name, column, to_name, column
                    );
                    relationships.push(Relationship {
                        from_table: (*from_name).clone(),
                        to_table: (*to_name).clone(),
                        from_column: column.to_string(),
                        to_column: column.to_string(),
                        cardinality: Cardinality::ManyToOne,
                    });
                }
            }
        }

        relationships
    }

    /// Whether the lowercase column name contains any key keyword.
    pub fn is_candidate_key(column: &str, keywords: &[String]) -> bool {
        let lower = column.to_lowercase();
        keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }
}
