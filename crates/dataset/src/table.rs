//! Column-oriented table with a declared value type per column.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::TableError;

/// Cell spellings read as missing values.
///
/// Lowercase `na` is deliberately absent: such cells keep their column
/// textual until the transformation stage cleans them.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A raw document as returned by the document store.
pub type Document = Map<String, Value>;

#[must_use]
pub fn is_na_token(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Text,
}

impl ColumnType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

/// Values of one column. Integer columns never hold missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// Infers the narrowest type that holds every cell.
    ///
    /// A column is `Int` when every cell is an integer and none is missing,
    /// `Float` when every present cell is a number, and `Text` otherwise.
    #[must_use]
    pub fn infer(cells: Vec<Option<String>>) -> Self {
        let cells: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| c.filter(|s| !is_na_token(s)))
            .collect();

        let has_missing = cells.iter().any(Option::is_none);

        if !has_missing && !cells.is_empty() {
            let ints: Option<Vec<i64>> = cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_int))
                .collect();
            if let Some(ints) = ints {
                return Self::Int(ints);
            }
        }

        let floats: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|c| match c.as_deref() {
                None => Some(None),
                Some(s) => parse_float(s).map(Some),
            })
            .collect();

        match floats {
            Some(floats) if !cells.is_empty() => Self::Float(floats),
            _ => Self::Text(cells),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn dtype(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Float(_) => ColumnType::Float,
            Self::Text(_) => ColumnType::Text,
        }
    }

    /// Text rendering of a cell as it is written to CSV; `None` when missing.
    #[must_use]
    pub fn cell_text(&self, row: usize) -> Option<String> {
        match self {
            Self::Int(v) => v.get(row).map(ToString::to_string),
            Self::Float(v) => v.get(row).copied().flatten().map(format_float),
            Self::Text(v) => v.get(row).cloned().flatten(),
        }
    }

    /// Every cell coerced to a number; missing or non-numeric cells are `None`.
    #[must_use]
    pub fn to_f64(&self) -> Vec<Option<f64>> {
        match self {
            Self::Int(v) => v.iter().map(|&x| Some(x as f64)).collect(),
            Self::Float(v) => v.iter().map(|x| x.filter(|f| !f.is_nan())).collect(),
            Self::Text(v) => v
                .iter()
                .map(|x| x.as_deref().and_then(parse_float).filter(|f| !f.is_nan()))
                .collect(),
        }
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Int(v) => Self::Int(rows.iter().map(|&r| v[r]).collect()),
            Self::Float(v) => Self::Float(rows.iter().map(|&r| v[r]).collect()),
            Self::Text(v) => Self::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Appends `other`, widening the type when the two sides disagree.
    fn append(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(mut a), Self::Int(b)) => {
                a.extend(b);
                Self::Int(a)
            }
            (a, b) if a.dtype().is_numeric() && b.dtype().is_numeric() => {
                let mut values = a.to_f64();
                values.extend(b.to_f64());
                Self::Float(values)
            }
            (a, b) => {
                let mut cells: Vec<Option<String>> = (0..a.len()).map(|r| a.cell_text(r)).collect();
                cells.extend((0..b.len()).map(|r| b.cell_text(r)));
                Self::Text(cells)
            }
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Renders a float so it reads back as a float (`1.0`, not `1`).
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    #[must_use]
    pub const fn dtype(&self) -> ColumnType {
        self.data.dtype()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Non-missing values that can be read as numbers, in row order.
    #[must_use]
    pub fn numeric_values(&self) -> Vec<f64> {
        self.data.to_f64().into_iter().flatten().collect()
    }
}

/// Rows are samples, columns are named, typed fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Builds a table from columns of equal length and distinct names.
    ///
    /// # Errors
    ///
    /// Returns an error if lengths differ or a name repeats.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();

        for column in &columns {
            if column.len() != n_rows {
                return Err(TableError::ColumnLength {
                    column: column.name.clone(),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Builds a table from raw text cells, inferring each column's type.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is longer or shorter than the header.
    pub fn from_raw(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self, TableError> {
        let width = headers.len();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];

        for row in rows {
            if row.len() != width {
                return Err(TableError::SchemaMismatch(format!(
                    "row has {} cells, header has {width}",
                    row.len()
                )));
            }
            for (column, cell) in cells.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::new(name, ColumnData::infer(cells)))
            .collect();

        Self::new(columns)
    }

    /// Builds a table from dynamic documents.
    ///
    /// Columns appear in first-seen key order; a key absent from a document
    /// is a missing cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting columns are inconsistent.
    pub fn from_documents(documents: &[Document]) -> Result<Self, TableError> {
        let mut headers: Vec<String> = Vec::new();
        let mut known = HashSet::new();

        for document in documents {
            for key in document.keys() {
                if known.insert(key.clone()) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = documents
            .iter()
            .map(|document| {
                headers
                    .iter()
                    .map(|key| document.get(key).and_then(json_cell))
                    .collect()
            })
            .collect();

        Self::from_raw(headers, rows)
    }

    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Replaces a column's values, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or the length differs.
    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<(), TableError> {
        if data.len() != self.n_rows {
            return Err(TableError::ColumnLength {
                column: name.to_string(),
                expected: self.n_rows,
                actual: data.len(),
            });
        }

        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
        column.data = data;
        Ok(())
    }

    /// Removes and returns a column.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Trims surrounding whitespace from every column name.
    pub fn strip_column_names(&mut self) {
        for column in &mut self.columns {
            let trimmed = column.name.trim();
            if trimmed.len() != column.name.len() {
                column.name = trimmed.to_string();
            }
        }
    }

    /// Drops the listed columns that are present and returns their names.
    ///
    /// Names that are not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref().trim()).collect();
        let mut dropped = Vec::new();

        self.columns.retain(|c| {
            if wanted.contains(c.name.as_str()) {
                dropped.push(c.name.clone());
                false
            } else {
                true
            }
        });

        dropped
    }

    /// New table with only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is not a column.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name.as_ref())
                    .cloned()
                    .ok_or_else(|| TableError::MissingColumn(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(columns)
    }

    /// New table holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if a row index is out of bounds.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Stacks `other` below `self`, matching columns by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the two tables have different column sets.
    pub fn concat(&self, other: &Self) -> Result<Self, TableError> {
        if self.n_cols() != other.n_cols() {
            return Err(TableError::SchemaMismatch(format!(
                "{} columns vs {} columns",
                self.n_cols(),
                other.n_cols()
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| {
                let rhs = other
                    .column(&c.name)
                    .ok_or_else(|| TableError::SchemaMismatch(format!("missing column {}", c.name)))?;
                Ok(Column::new(c.name.clone(), c.data.clone().append(rhs.data.clone())))
            })
            .collect::<Result<Vec<_>, TableError>>()?;

        Self::new(columns)
    }

    /// Encodes the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.column_names())?;

        for row in 0..self.n_rows {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|c| c.data.cell_text(row).unwrap_or_default()),
            )?;
        }

        writer
            .into_inner()
            .map_err(|e| TableError::Csv(csv::Error::from(e.into_error())))
    }

    /// Decodes CSV with a header row, inferring column types.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();

        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|s| Some(s.to_string())).collect());
        }

        Self::from_raw(headers, rows)
    }
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_infer_types() {
        let int = ColumnData::infer(vec![Some("1".into()), Some("-2".into())]);
        assert_eq!(int, ColumnData::Int(vec![1, -2]));

        let float = ColumnData::infer(vec![Some("1".into()), Some(String::new()), Some("2.5".into())]);
        assert_eq!(float, ColumnData::Float(vec![Some(1.0), None, Some(2.5)]));

        let text = ColumnData::infer(vec![Some("1".into()), Some("na".into()), Some("NA".into())]);
        assert_eq!(
            text,
            ColumnData::Text(vec![Some("1".into()), Some("na".into()), None])
        );

        let all_missing = ColumnData::infer(vec![None, Some("nan".into())]);
        assert_eq!(all_missing.dtype(), ColumnType::Float);
    }

    #[test]
    fn test_from_documents_unions_keys() {
        let docs = vec![
            doc(json!({"class": "neg", "aa_000": 10})),
            doc(json!({"class": "pos", "ab_000": "na", "aa_000": 20})),
        ];

        let table = Table::from_documents(&docs).expect("table");
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["class", "aa_000", "ab_000"]
        );
        assert_eq!(table.column("aa_000").map(Column::dtype), Some(ColumnType::Int));
        assert_eq!(table.column("ab_000").map(Column::dtype), Some(ColumnType::Text));
    }

    #[test]
    fn test_csv_round_trip_keeps_types() {
        let table = Table::new(vec![
            Column::new("class", ColumnData::Text(vec![Some("neg".into()), Some("pos".into())])),
            Column::new("aa_000", ColumnData::Int(vec![1, 2])),
            Column::new("ab_000", ColumnData::Float(vec![Some(1.0), None])),
        ])
        .expect("table");

        let bytes = table.to_csv_bytes().expect("csv");
        let text = String::from_utf8(bytes.clone()).expect("utf8");
        assert!(text.starts_with("class,aa_000,ab_000\n"));
        assert!(text.contains("neg,1,1.0\n"));

        let parsed = Table::from_csv_bytes(&bytes).expect("parse");
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_strip_and_drop_columns() {
        let mut table = Table::new(vec![
            Column::new(" aa_000 ", ColumnData::Int(vec![1])),
            Column::new("br_000", ColumnData::Int(vec![2])),
        ])
        .expect("table");

        table.strip_column_names();
        let dropped = table.drop_columns(&["br_000", "cr_000"]);

        assert_eq!(dropped, vec!["br_000".to_string()]);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["aa_000"]);
    }

    #[test]
    fn test_concat_widens_types() {
        let a = Table::new(vec![Column::new("x", ColumnData::Int(vec![1]))]).expect("a");
        let b = Table::new(vec![Column::new("x", ColumnData::Float(vec![None]))]).expect("b");
        let c = Table::new(vec![Column::new("x", ColumnData::Text(vec![Some("na".into())]))])
            .expect("c");

        let ab = a.concat(&b).expect("ab");
        assert_eq!(ab.column("x").map(|c| c.data.clone()), Some(ColumnData::Float(vec![Some(1.0), None])));

        let ac = a.concat(&c).expect("ac");
        assert_eq!(
            ac.column("x").map(|c| c.data.clone()),
            Some(ColumnData::Text(vec![Some("1".into()), Some("na".into())]))
        );
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::new("a", ColumnData::Int(vec![1, 2])),
            Column::new("b", ColumnData::Int(vec![1])),
        ]);
        assert!(matches!(result, Err(TableError::ColumnLength { .. })));
    }

    #[test]
    fn test_select_reorders_and_reports_missing() {
        let table = Table::new(vec![
            Column::new("a", ColumnData::Int(vec![1])),
            Column::new("b", ColumnData::Int(vec![2])),
        ])
        .expect("table");

        let selected = table.select(&["b", "a"]).expect("select");
        assert_eq!(selected.column_names().collect::<Vec<_>>(), vec!["b", "a"]);

        assert!(matches!(
            table.select(&["c"]),
            Err(TableError::MissingColumn(name)) if name == "c"
        ));
    }
}
