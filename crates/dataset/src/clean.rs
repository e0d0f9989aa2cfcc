//! Cleaning applied to snapshots before they are turned into features.

use sensor_structs::{TargetValueMapping, UnknownLabel};
use tracing::debug;

use crate::{ColumnData, Table, TableError};

/// Token the sensor export uses for missing readings.
pub const NA_TOKEN: &str = "na";

/// Replaces every textual cell equal to `token` with a missing value.
///
/// Returns the number of cells replaced.
pub fn replace_na_tokens(table: &mut Table, token: &str) -> usize {
    let mut replaced = 0;
    let names: Vec<String> = table.column_names().map(str::to_string).collect();

    for name in names {
        let Some(ColumnData::Text(cells)) = table.column(&name).map(|c| c.data.clone()) else {
            continue;
        };

        let cleaned: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| match cell {
                Some(s) if s == token => {
                    replaced += 1;
                    None
                }
                other => other,
            })
            .collect();

        // Name and length are unchanged, so replacing cannot fail.
        let _ = table.replace_column(&name, ColumnData::Text(cleaned));
    }

    replaced
}

/// Coerces every column except `keep` to floats.
///
/// Values that cannot be read as numbers become missing; this never fails.
pub fn coerce_numeric(table: &mut Table, keep: &[&str]) {
    let names: Vec<String> = table
        .column_names()
        .filter(|name| !keep.contains(name))
        .map(str::to_string)
        .collect();

    for name in names {
        let Some(values) = table.column(&name).map(|c| c.data.to_f64()) else {
            continue;
        };
        let _ = table.replace_column(&name, ColumnData::Float(values));
    }
}

/// Full cleaning pass: `na` tokens become missing, then every non-target
/// column is coerced to numbers.
pub fn clean_snapshot(table: &mut Table, target_column: &str) {
    let replaced = replace_na_tokens(table, NA_TOKEN);
    coerce_numeric(table, &[target_column]);
    debug!(replaced, columns = table.n_cols(), "Snapshot cleaned");
}

/// Encodes every label of the target column.
///
/// # Errors
///
/// Returns [`UnknownLabel`] on the first label outside the mapping; a missing
/// label is reported with an empty name.
pub fn encode_target(
    data: &ColumnData,
    mapping: TargetValueMapping,
) -> Result<Vec<u8>, UnknownLabel> {
    (0..data.len())
        .map(|row| match data.cell_text(row) {
            Some(label) => mapping.encode(&label),
            None => Err(UnknownLabel {
                label: String::new(),
            }),
        })
        .collect()
}

/// Splits a snapshot into its feature table and encoded target vector.
///
/// # Errors
///
/// Returns an error if the target column is missing or holds an unknown label.
pub fn split_features_target(
    mut table: Table,
    target_column: &str,
    mapping: TargetValueMapping,
) -> Result<(Table, Vec<u8>), TableError> {
    let target = table
        .remove_column(target_column)
        .ok_or_else(|| TableError::MissingColumn(target_column.to_string()))?;

    let labels = encode_target(&target.data, mapping)?;
    Ok((table, labels))
}
