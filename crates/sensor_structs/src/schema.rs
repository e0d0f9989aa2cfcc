//! Schema descriptor loaded from `schema.yaml`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Failure to load a schema descriptor.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One entry of the `columns` list.
///
/// Both `- aa_000` and `- aa_000: float` spellings are accepted; the declared
/// type is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Name(String),
    Typed(BTreeMap<String, String>),
}

impl ColumnSpec {
    /// Column name of this entry.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name.as_str()),
            Self::Typed(map) => map.keys().next().map(String::as_str),
        }
    }
}

/// Declared contract of the sensor dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Expected columns; only their count is checked.
    pub columns: Vec<ColumnSpec>,
    /// Columns that must be present.
    #[serde(default)]
    pub numerical_columns: Vec<String>,
    /// Columns removed at ingestion when present.
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

impl SchemaDescriptor {
    /// Parses a schema from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or lacks `columns`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a schema from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Number of expected columns.
    #[must_use]
    pub fn expected_column_count(&self) -> usize {
        self.columns.len()
    }

    /// Names of the expected columns, in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(ColumnSpec::name)
    }
}
