use std::time::Duration;

use anyhow::Context;
use config::constants::TARGET_COLUMN;
use config::{ArtifactStore, DataTransformationConfig};
use dataset::{NumericArray, Table, clean_snapshot, split_features_target};
use ml_model::{FittedPreprocessor, ModelError, Preprocessor, SmoteTomek};
use sensor_structs::{DataTransformationArtifact, DataValidationArtifact, TargetValueMapping};
use tracing::{debug, info};

use super::read_table;
use crate::{CancellationToken, SensorError, Stage};

/// Cleans, scales and rebalances the validated snapshots.
pub struct DataTransformation<'a> {
    config: DataTransformationConfig,
    store: &'a ArtifactStore,
    cancellation: &'a CancellationToken,
    resample_timeout: Duration,
}

/// Features and encoded labels of one cleaned snapshot.
pub(crate) struct LabelledFeatures {
    pub features: Table,
    pub labels: Vec<u8>,
}

/// Cleans `table` and separates the target column.
///
/// # Errors
///
/// Fails with [`SensorError::UnknownLabel`] on a label outside the mapping.
pub(crate) fn prepare_snapshot(mut table: Table) -> Result<LabelledFeatures, SensorError> {
    clean_snapshot(&mut table, TARGET_COLUMN);
    let (features, labels) = split_features_target(table, TARGET_COLUMN, TargetValueMapping)?;
    Ok(LabelledFeatures { features, labels })
}

impl<'a> DataTransformation<'a> {
    #[must_use]
    pub const fn new(
        config: DataTransformationConfig,
        store: &'a ArtifactStore,
        cancellation: &'a CancellationToken,
        resample_timeout: Duration,
    ) -> Self {
        Self {
            config,
            store,
            cancellation,
            resample_timeout,
        }
    }

    /// Rebalances one split off the async runtime and appends its labels as
    /// the last column.
    async fn resample(
        &self,
        split: &str,
        features: NumericArray,
        labels: Vec<u8>,
    ) -> Result<NumericArray, SensorError> {
        self.cancellation.check(Stage::DataTransformation)?;
        debug!(split, rows = features.rows(), "Resampling");

        let resampler = SmoteTomek::new().with_seed(self.config.resample_seed);
        let task = tokio::task::spawn_blocking(move || -> Result<NumericArray, ModelError> {
            let (resampled, resampled_labels) = resampler.fit_resample(&features, &labels)?;
            Ok(resampled.with_target_column(&resampled_labels)?)
        });

        let resampled = tokio::time::timeout(self.resample_timeout, task)
            .await
            .map_err(|_| SensorError::ResampleTimedOut(self.resample_timeout))?
            .context("Resampling task failed")??;
        Ok(resampled)
    }

    /// # Errors
    ///
    /// Returns an error if a snapshot cannot be read, holds an unknown label,
    /// or the test features lack a train column. Resampling fails with
    /// [`SensorError::Cancelled`] when cancellation was requested and with
    /// [`SensorError::ResampleTimedOut`] when it outlives the timeout.
    pub async fn run(
        &self,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact, SensorError> {
        let train = prepare_snapshot(read_table(self.store, &validation.valid_train_file_path).await?)?;
        let test = prepare_snapshot(read_table(self.store, &validation.valid_test_file_path).await?)?;

        let feature_names: Vec<String> = train.features.column_names().map(str::to_string).collect();
        let train_features = NumericArray::from_table(&train.features)?;
        let test_features = NumericArray::from_table(&test.features.select(&feature_names)?)?;

        // Fitted on train only, applied unchanged to test.
        let preprocessor = Preprocessor::fit(&train_features)?;
        let train_scaled = preprocessor.transform(&train_features)?;
        let test_scaled = preprocessor.transform(&test_features)?;

        let train_arr = self.resample("train", train_scaled, train.labels).await?;
        let test_arr = self.resample("test", test_scaled, test.labels).await?;

        self.store
            .put(&self.config.transformed_train_file_path, train_arr.to_bytes())
            .await?;
        self.store
            .put(&self.config.transformed_test_file_path, test_arr.to_bytes())
            .await?;

        let fitted = FittedPreprocessor {
            feature_names,
            preprocessor,
        };
        let object = serde_json::to_vec_pretty(&fitted).context("Failed to encode preprocessor")?;
        self.store
            .put(&self.config.transformed_object_file_path, object)
            .await?;

        info!(
            train_rows = train_arr.rows(),
            test_rows = test_arr.rows(),
            features = fitted.feature_names.len(),
            "Transformed arrays saved"
        );

        let artifact = DataTransformationArtifact {
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
        };
        info!(?artifact, "Data transformation artifact created");
        Ok(artifact)
    }
}
