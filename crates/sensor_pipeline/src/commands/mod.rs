//! CLI command implementations.

pub mod load_csv;
pub mod train;
