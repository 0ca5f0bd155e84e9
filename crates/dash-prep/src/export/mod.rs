//! Export of cleaned tables for the publishing side.
//!
//! - [`TableExporter`]: cleaned frame → [`ProcessedTable`](crate::types::ProcessedTable)
//!   with a destination schema and JSON-safe rows
//! - [`RelationshipDetector`]: probable joins between exported tables

mod relationships;
mod table;

pub use relationships::RelationshipDetector;
pub use table::{TableExporter, export_type, frame_rows, json_values};
