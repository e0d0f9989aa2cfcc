//! Turns a CSV export into JSON records for loading into a collection.

use dataset::Document;
use serde_json::{Number, Value};

use crate::StoreError;

/// Parses CSV bytes into one record per row.
///
/// Integers and floats become JSON numbers, empty cells become `null` and
/// everything else (including `"na"`) is kept as a string.
///
/// # Errors
///
/// Returns an error if the CSV is malformed.
pub fn documents_from_csv(bytes: &[u8]) -> Result<Vec<Document>, StoreError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut documents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let document: Document = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.clone(), cell_value(cell)))
            .collect();
        documents.push(document);
    }

    Ok(documents)
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::from(int);
    }
    // Non-finite floats such as `nan` stay strings.
    if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(cell.to_string())
}
