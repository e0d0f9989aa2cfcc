//! Tabular snapshots of the sensor dataset.
//!
//! This crate holds the column-typed [`Table`] produced by ingestion, its CSV
//! encoding, the cleaning steps applied before transformation, the train/test
//! split, and the raw numeric arrays persisted by the transformation stage.

mod array;
mod clean;
mod split;
mod table;

pub use array::*;
pub use clean::*;
pub use split::*;
pub use table::*;

/// Errors raised while building, encoding or reshaping tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("column {column} has {actual} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate column {0}")]
    DuplicateColumn(String),
    #[error("missing column {0}")]
    MissingColumn(String),
    #[error("column {0} is not numeric")]
    NonNumericColumn(String),
    #[error("column sets differ: {0}")]
    SchemaMismatch(String),
    #[error("cannot split {rows} rows with test size {test_size}")]
    InvalidSplit { rows: usize, test_size: f64 },
    #[error("malformed numeric array: {0}")]
    MalformedArray(String),
    #[error(transparent)]
    UnknownLabel(#[from] sensor_structs::UnknownLabel),
}
