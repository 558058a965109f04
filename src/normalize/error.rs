//! Error types for the schema normalizer.

use thiserror::Error;

use crate::parse::ParseError;
use crate::source::Layout;

/// Failures mapping a raw table onto the canonical schema.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A column the era mapping does not know.
    #[error("unrecognized column '{column}' in {layout} file")]
    UnrecognizedColumn { layout: Layout, column: String },

    /// A code value the era's code tables do not know.
    #[error("data row {row}: unrecognized {column} code '{value}' in {layout} file")]
    UnrecognizedCode {
        layout: Layout,
        column: String,
        value: String,
        row: u64,
    },

    /// A column the era mapping requires is absent.
    #[error("{layout} file is missing required column '{column}'")]
    MissingColumn {
        layout: Layout,
        column: &'static str,
    },

    /// A cell could not be read.
    #[error(transparent)]
    Malformed(#[from] ParseError),
}

impl NormalizeError {
    /// Whether the raw data holds something the mapping does not cover.
    #[must_use]
    pub fn is_mapping_gap(&self) -> bool {
        !matches!(self, Self::Malformed(_))
    }
}
