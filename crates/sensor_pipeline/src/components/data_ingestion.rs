use std::time::Duration;

use anyhow::Context;
use config::{ArtifactStore, DataIngestionConfig};
use database::DocumentSource;
use dataset::{Table, train_test_split};
use sensor_structs::{DataIngestionArtifact, SchemaDescriptor};
use tracing::{debug, info};

use super::write_table;
use crate::SensorError;

/// Pulls a collection from the document store and splits it into train and
/// test snapshots.
pub struct DataIngestion<'a, S> {
    config: DataIngestionConfig,
    schema: &'a SchemaDescriptor,
    source: &'a S,
    store: &'a ArtifactStore,
    source_timeout: Duration,
}

impl<'a, S: DocumentSource> DataIngestion<'a, S> {
    #[must_use]
    pub const fn new(
        config: DataIngestionConfig,
        schema: &'a SchemaDescriptor,
        source: &'a S,
        store: &'a ArtifactStore,
        source_timeout: Duration,
    ) -> Self {
        Self {
            config,
            schema,
            source,
            store,
            source_timeout,
        }
    }

    /// Fetches every record of the configured collection into a table and
    /// persists it to the feature store as exported.
    ///
    /// # Errors
    ///
    /// Fails with [`SensorError::SourceUnavailable`] if the query fails or
    /// times out, and [`SensorError::EmptySource`] if there are no records.
    pub async fn export_data_into_feature_store(&self) -> Result<Table, SensorError> {
        let collection_name = self.config.collection_name.as_str();
        info!(collection = collection_name, "Exporting collection to feature store");

        let documents = tokio::time::timeout(
            self.source_timeout,
            self.source.export_collection(collection_name),
        )
        .await
        .map_err(|_| {
            SensorError::SourceUnavailable(format!(
                "query on {collection_name} timed out after {:?}",
                self.source_timeout
            ))
        })?
        .map_err(|e| SensorError::SourceUnavailable(e.to_string()))?;

        let table = Table::from_documents(&documents)
            .with_context(|| format!("Failed to tabulate collection {collection_name}"))?;

        if table.is_empty() {
            return Err(SensorError::EmptySource {
                collection: collection_name.to_string(),
            });
        }

        write_table(self.store, &self.config.feature_store_file_path, &table).await?;

        info!(
            rows = table.n_rows(),
            columns = table.n_cols(),
            path = %self.config.feature_store_file_path,
            "Data exported to feature store"
        );
        Ok(table)
    }

    /// Shuffles `table` into train and test snapshots and persists both.
    ///
    /// # Errors
    ///
    /// Returns an error if the split is impossible or writing fails.
    pub async fn split_data_as_train_test(&self, table: &Table) -> Result<(), SensorError> {
        let (train, test) = train_test_split(
            table,
            self.config.train_test_split_ratio,
            self.config.split_seed,
        )?;

        write_table(self.store, &self.config.training_file_path, &train).await?;
        write_table(self.store, &self.config.testing_file_path, &test).await?;

        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "Train and test files saved"
        );
        Ok(())
    }

    /// # Errors
    ///
    /// See [`DataIngestion::export_data_into_feature_store`] and
    /// [`DataIngestion::split_data_as_train_test`].
    pub async fn run(&self) -> Result<DataIngestionArtifact, SensorError> {
        let mut table = self.export_data_into_feature_store().await?;

        table.strip_column_names();
        let dropped = table.drop_columns(&self.schema.drop_columns);
        debug!(?dropped, "Dropped schema columns");

        self.split_data_as_train_test(&table).await?;

        let artifact = DataIngestionArtifact {
            trained_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        };
        info!(?artifact, "Data ingestion artifact created");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use config::TrainingPipelineConfig;
    use database::InMemoryDocumentStore;
    use dataset::Document;
    use serde_json::json;

    use super::*;
    use crate::components::read_table;

    fn record(i: usize) -> Document {
        match json!({
            "_id": i,
            "class": if i % 4 == 0 { "pos" } else { "neg" },
            " aa_000 ": i as f64,
            "br_000": 1,
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("record literal is an object"),
        }
    }

    fn config() -> DataIngestionConfig {
        let ts = chrono::Local
            .with_ymd_and_hms(2025, 2, 3, 4, 5, 6)
            .single()
            .expect("time");
        DataIngestionConfig::new(&TrainingPipelineConfig::new(ts))
            .with_collection_name("trucks")
            .with_split_seed(1)
    }

    #[tokio::test]
    async fn test_run_reads_configured_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let source = InMemoryDocumentStore::new();
        let records: Vec<Document> = (0..20).map(record).collect();
        source.insert_documents("trucks", &records).await.expect("insert");
        source.insert_documents("car", &records[..5]).await.expect("insert");
        let schema = SchemaDescriptor::from_yaml_str("columns: [class, aa_000]\ndrop_columns: [br_000]\n")
            .expect("schema");

        let artifact = DataIngestion::new(config(), &schema, &source, &store, Duration::from_secs(5))
            .run()
            .await
            .expect("ingestion");

        let train = read_table(&store, &artifact.trained_file_path)
            .await
            .expect("train");
        let test = read_table(&store, &artifact.test_file_path)
            .await
            .expect("test");
        assert_eq!(train.n_rows() + test.n_rows(), 20);
        assert_eq!(train.column_names().collect::<Vec<_>>(), vec!["class", "aa_000"]);
    }

    #[tokio::test]
    async fn test_feature_store_keeps_exported_column_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let source = InMemoryDocumentStore::new();
        let records: Vec<Document> = (0..10).map(record).collect();
        source.insert_documents("trucks", &records).await.expect("insert");
        let schema = SchemaDescriptor::default();

        let config = config();
        DataIngestion::new(config.clone(), &schema, &source, &store, Duration::from_secs(5))
            .run()
            .await
            .expect("ingestion");

        let feature_store = read_table(&store, &config.feature_store_file_path)
            .await
            .expect("feature store");
        assert!(feature_store.contains(" aa_000 "));
        assert!(feature_store.contains("br_000"));
        assert!(!feature_store.contains("_id"));
        assert_eq!(feature_store.n_rows(), 10);
    }

    #[tokio::test]
    async fn test_missing_configured_collection_is_empty_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let source = InMemoryDocumentStore::new();
        source
            .insert_documents("car", &[record(0)])
            .await
            .expect("insert");
        let schema = SchemaDescriptor::default();

        let error = DataIngestion::new(config(), &schema, &source, &store, Duration::from_secs(5))
            .run()
            .await
            .expect_err("empty");
        assert!(matches!(error, SensorError::EmptySource { collection } if collection == "trucks"));
    }
}
