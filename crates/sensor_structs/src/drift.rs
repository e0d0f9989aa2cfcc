//! Per-column distribution drift between the train and test snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label written when a column has no usable values on one side.
pub const INSUFFICIENT_DATA: &str = "insufficient data";

/// Outcome of the two-sample test for one column.
///
/// `Same(true)` means the distributions are statistically indistinguishable
/// at the configured threshold, i.e. no drift. `Same(false)` means drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DriftStatusRepr", try_from = "DriftStatusRepr")]
pub enum DriftStatus {
    Same(bool),
    InsufficientData,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DriftStatusRepr {
    Flag(bool),
    Label(String),
}

impl From<DriftStatus> for DriftStatusRepr {
    fn from(status: DriftStatus) -> Self {
        match status {
            DriftStatus::Same(flag) => Self::Flag(flag),
            DriftStatus::InsufficientData => Self::Label(INSUFFICIENT_DATA.to_string()),
        }
    }
}

impl TryFrom<DriftStatusRepr> for DriftStatus {
    type Error = String;

    fn try_from(repr: DriftStatusRepr) -> Result<Self, Self::Error> {
        match repr {
            DriftStatusRepr::Flag(flag) => Ok(Self::Same(flag)),
            DriftStatusRepr::Label(label) if label.eq_ignore_ascii_case(INSUFFICIENT_DATA) => {
                Ok(Self::InsufficientData)
            }
            DriftStatusRepr::Label(label) => Err(format!("unknown drift status {label:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: Option<f64>,
    pub drift_status: DriftStatus,
}

impl ColumnDrift {
    #[must_use]
    pub const fn insufficient_data() -> Self {
        Self {
            p_value: None,
            drift_status: DriftStatus::InsufficientData,
        }
    }

    /// Builds the entry for a tested column.
    #[must_use]
    pub fn tested(p_value: f64, threshold: f64) -> Self {
        Self {
            p_value: Some(p_value),
            drift_status: DriftStatus::Same(p_value > threshold),
        }
    }

    /// Whether the test found significant drift.
    #[must_use]
    pub const fn is_drifted(&self) -> bool {
        matches!(self.drift_status, DriftStatus::Same(false))
    }
}

/// Drift entry per numeric column, keyed and ordered by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    pub columns: BTreeMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn insert(&mut self, column: impl Into<String>, drift: ColumnDrift) {
        self.columns.insert(column.into(), drift);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.get(column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Names of the columns whose distributions differ.
    pub fn drifted_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, drift)| drift.is_drifted())
            .map(|(name, _)| name.as_str())
    }

    /// Renders the report as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parses a report written by [`DriftReport::to_yaml`].
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
