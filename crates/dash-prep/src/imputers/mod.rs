//! Imputation module for handling missing values.
//!
//! This module provides the fill strategies used by the cleaner:
//! - Median imputation with a zero fallback for sparse numeric columns
//! - Constant imputation for text columns
//! - Forward fill for timestamp columns

mod statistical;

pub use statistical::StatisticalImputer;
