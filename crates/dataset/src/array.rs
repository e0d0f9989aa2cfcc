//! Dense `f32` matrices and their on-disk encoding.
//!
//! The file layout is a 16-byte header (`rows` and `cols` as little-endian
//! `u64`) followed by the row-major `f32` values.

use bytemuck::{cast_slice, pod_collect_to_vec};

use crate::{Table, TableError};

const HEADER_LEN: usize = 16;

/// Row-major numeric matrix. Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl NumericArray {
    /// Wraps row-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, TableError> {
        if data.len() != rows * cols {
            return Err(TableError::MalformedArray(format!(
                "{} values for a {rows}x{cols} array",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds an array from row slices of equal width.
    ///
    /// # Errors
    ///
    /// Returns an error if a row has the wrong width.
    pub fn from_rows(cols: usize, rows: &[Vec<f32>]) -> Result<Self, TableError> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(TableError::MalformedArray(format!(
                    "row of width {} in a {cols}-column array",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, data)
    }

    /// Converts an all-numeric table; missing cells become `NaN`.
    ///
    /// # Errors
    ///
    /// Returns an error if any column is textual.
    pub fn from_table(table: &Table) -> Result<Self, TableError> {
        let rows = table.n_rows();
        let cols = table.n_cols();
        let mut data = vec![f32::NAN; rows * cols];

        for (j, column) in table.columns().iter().enumerate() {
            if !column.dtype().is_numeric() {
                return Err(TableError::NonNumericColumn(column.name.clone()));
            }
            for (i, value) in column.data.to_f64().into_iter().enumerate() {
                if let Some(v) = value {
                    data[i * cols + j] = v as f32;
                }
            }
        }

        Self::new(rows, cols, data)
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// One row.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Copy of one column.
    #[must_use]
    pub fn column(&self, j: usize) -> Vec<f32> {
        (0..self.rows).map(|i| self.data[i * self.cols + j]).collect()
    }

    /// Appends `targets` as a trailing column.
    ///
    /// # Errors
    ///
    /// Returns an error if there is not one target per row.
    pub fn with_target_column(&self, targets: &[u8]) -> Result<Self, TableError> {
        if targets.len() != self.rows {
            return Err(TableError::MalformedArray(format!(
                "{} targets for {} rows",
                targets.len(),
                self.rows
            )));
        }

        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for (i, &target) in targets.iter().enumerate() {
            data.extend_from_slice(self.row(i));
            data.push(f32::from(target));
        }
        Self::new(self.rows, cols, data)
    }

    /// Splits off the trailing column as integer class labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the array has no columns or a label is not 0/1.
    pub fn split_target_column(&self) -> Result<(Self, Vec<u8>), TableError> {
        if self.cols == 0 {
            return Err(TableError::MalformedArray("no target column".to_string()));
        }

        let cols = self.cols - 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        let mut targets = Vec::with_capacity(self.rows);

        for i in 0..self.rows {
            let row = self.row(i);
            data.extend_from_slice(&row[..cols]);
            let label = row[cols];
            if label != 0.0 && label != 1.0 {
                return Err(TableError::MalformedArray(format!(
                    "target value {label} in row {i}"
                )));
            }
            targets.push(label as u8);
        }

        Ok((Self::new(self.rows, cols, data)?, targets))
    }

    /// Encodes the array in the on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(&(self.rows as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.cols as u64).to_le_bytes());
        bytes.extend_from_slice(cast_slice(&self.data));
        bytes
    }

    /// Decodes an array written by [`NumericArray::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the header or payload size is inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let (Some(rows), Some(cols)) = (read_u64(bytes, 0), read_u64(bytes, 8)) else {
            return Err(TableError::MalformedArray("truncated header".to_string()));
        };

        let payload = &bytes[HEADER_LEN..];
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()));
        if expected != Some(payload.len()) {
            return Err(TableError::MalformedArray(format!(
                "{} payload bytes for a {rows}x{cols} array",
                payload.len()
            )));
        }

        let data: Vec<f32> = pod_collect_to_vec(payload);
        Self::new(rows, cols, data)
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<usize> {
    let raw: [u8; 8] = bytes.get(offset..offset + 8)?.try_into().ok()?;
    usize::try_from(u64::from_le_bytes(raw)).ok()
}
