use anyhow::Context;
use config::{ArtifactStore, DataValidationConfig};
use dataset::Table;
use sensor_structs::{
    ColumnDrift, DataIngestionArtifact, DataValidationArtifact, DriftReport, SchemaDescriptor,
};
use tracing::{info, warn};

use super::read_table;
use crate::{SensorError, ks_2samp};

/// Checks snapshots against the schema and measures train/test drift.
pub struct DataValidation<'a> {
    config: DataValidationConfig,
    schema: &'a SchemaDescriptor,
    store: &'a ArtifactStore,
}

impl<'a> DataValidation<'a> {
    #[must_use]
    pub const fn new(
        config: DataValidationConfig,
        schema: &'a SchemaDescriptor,
        store: &'a ArtifactStore,
    ) -> Self {
        Self {
            config,
            schema,
            store,
        }
    }

    /// Whether `table` has as many columns as the schema declares. Names and
    /// order are not compared.
    #[must_use]
    pub fn validate_number_of_columns(&self, table: &Table) -> bool {
        let expected = self.schema.expected_column_count();
        info!(expected, actual = table.n_cols(), "Checking number of columns");
        table.n_cols() == expected
    }

    /// Whether every declared numerical column is present.
    #[must_use]
    pub fn is_numerical_column_exist(&self, table: &Table) -> bool {
        let missing: Vec<&str> = self
            .schema
            .numerical_columns
            .iter()
            .map(String::as_str)
            .filter(|name| !table.contains(name))
            .collect();

        if !missing.is_empty() {
            warn!(?missing, "Missing numerical columns");
        }
        missing.is_empty()
    }

    /// Runs both schema checks on both snapshots and collects every failure.
    #[must_use]
    pub fn schema_violations(&self, train: &Table, test: &Table) -> Vec<String> {
        let mut violations = Vec::new();

        for (split, table) in [("Train", train), ("Test", test)] {
            if !self.validate_number_of_columns(table) {
                violations.push(format!(
                    "{split} snapshot has {} columns, expected {}",
                    table.n_cols(),
                    self.schema.expected_column_count()
                ));
            }
        }
        for (split, table) in [("Train", train), ("Test", test)] {
            if !self.is_numerical_column_exist(table) {
                violations.push(format!("{split} snapshot lacks required numerical columns"));
            }
        }

        violations
    }

    /// KS-tests every numeric train column against the same test column.
    ///
    /// A column with no usable values on either side, or absent from
    /// `current`, is reported as insufficient data.
    #[must_use]
    pub fn detect_dataset_drift(&self, base: &Table, current: &Table) -> DriftReport {
        let mut report = DriftReport::default();

        for column in base.columns() {
            if !column.dtype().is_numeric() {
                continue;
            }

            let base_values = column.numeric_values();
            let current_values = current
                .column(&column.name)
                .map(|c| c.numeric_values())
                .unwrap_or_default();

            let drift = match ks_2samp(&base_values, &current_values) {
                Some(test) => ColumnDrift::tested(test.p_value, self.config.drift_threshold),
                None => {
                    warn!(column = %column.name, "Insufficient data for drift test");
                    ColumnDrift::insufficient_data()
                }
            };
            report.insert(column.name.clone(), drift);
        }

        report
    }

    /// # Errors
    ///
    /// Fails with [`SensorError::SchemaValidation`] listing every violation
    /// if either snapshot breaks the schema; no drift report is written then.
    pub async fn run(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, SensorError> {
        let train = read_table(self.store, &ingestion.trained_file_path).await?;
        let test = read_table(self.store, &ingestion.test_file_path).await?;

        let violations = self.schema_violations(&train, &test);
        if !violations.is_empty() {
            return Err(SensorError::SchemaValidation(violations));
        }

        let report = self.detect_dataset_drift(&train, &test);
        let drifted: Vec<&str> = report.drifted_columns().collect();
        info!(
            columns = report.len(),
            drifted = drifted.len(),
            "Drift detection finished"
        );

        let yaml = report.to_yaml().context("Failed to encode drift report")?;
        self.store
            .put(&self.config.drift_report_file_path, yaml.into_bytes())
            .await?;

        let artifact = DataValidationArtifact {
            validation_status: true,
            valid_train_file_path: ingestion.trained_file_path.clone(),
            valid_test_file_path: ingestion.test_file_path.clone(),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        };
        info!(?artifact, "Data validation artifact created");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use config::TrainingPipelineConfig;
    use dataset::{Column, ColumnData};
    use sensor_structs::DriftStatus;

    use super::*;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::from_yaml_str(
            "columns:\n  - class\n  - aa_000\n  - ab_000\nnumerical_columns:\n  - aa_000\n  - ab_000\n",
        )
        .expect("schema")
    }

    fn run_config() -> DataValidationConfig {
        let ts = chrono::Local
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("time");
        DataValidationConfig::new(&TrainingPipelineConfig::new(ts))
    }

    fn table(columns: Vec<Column>) -> Table {
        Table::new(columns).expect("table")
    }

    #[test]
    fn test_column_count_ignores_names_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let schema = schema();
        let validation = DataValidation::new(run_config(), &schema, &store);

        let renamed = table(vec![
            Column::new("z", ColumnData::Int(vec![1])),
            Column::new("y", ColumnData::Int(vec![1])),
            Column::new("x", ColumnData::Int(vec![1])),
        ]);
        assert!(validation.validate_number_of_columns(&renamed));

        let short = table(vec![Column::new("class", ColumnData::Int(vec![1]))]);
        assert!(!validation.validate_number_of_columns(&short));
    }

    #[test]
    fn test_violations_accumulate_for_both_splits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let schema = schema();
        let validation = DataValidation::new(run_config(), &schema, &store);

        let short = table(vec![Column::new("class", ColumnData::Int(vec![1]))]);
        let violations = validation.schema_violations(&short, &short);
        assert_eq!(violations.len(), 4);
        assert!(violations[0].starts_with("Train"));
        assert!(violations[1].starts_with("Test"));
    }

    #[test]
    fn test_drift_marks_missing_values_as_insufficient() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let schema = schema();
        let validation = DataValidation::new(run_config(), &schema, &store);

        let base = table(vec![
            Column::new("aa_000", ColumnData::Float(vec![None, None])),
            Column::new("ab_000", ColumnData::Int(vec![1, 2])),
            Column::new("ac_000", ColumnData::Int(vec![1, 2])),
            Column::new("class", ColumnData::Text(vec![Some("neg".into()), Some("pos".into())])),
        ]);
        let current = table(vec![
            Column::new("aa_000", ColumnData::Float(vec![Some(1.0)])),
            Column::new("ab_000", ColumnData::Int(vec![1])),
        ]);

        let report = validation.detect_dataset_drift(&base, &current);
        assert_eq!(report.len(), 3);
        assert_eq!(
            report.get("aa_000").map(|d| d.drift_status),
            Some(DriftStatus::InsufficientData)
        );
        assert_eq!(report.get("aa_000").and_then(|d| d.p_value), None);
        assert_eq!(
            report.get("ac_000").map(|d| d.drift_status),
            Some(DriftStatus::InsufficientData)
        );
        assert!(report.get("ab_000").and_then(|d| d.p_value).is_some());
        assert!(report.get("class").is_none());
    }

    #[test]
    fn test_identical_columns_are_not_drifted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let schema = schema();
        let validation = DataValidation::new(run_config(), &schema, &store);

        let values: Vec<i64> = (0..40).collect();
        let base = table(vec![Column::new("aa_000", ColumnData::Int(values.clone()))]);
        let current = table(vec![Column::new("aa_000", ColumnData::Int(values))]);

        let report = validation.detect_dataset_drift(&base, &current);
        assert_eq!(
            report.get("aa_000").map(|d| d.drift_status),
            Some(DriftStatus::Same(true))
        );
    }
}
