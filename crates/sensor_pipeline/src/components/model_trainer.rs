use std::time::Duration;

use anyhow::Context;
use config::{ArtifactStore, ModelTrainerConfig};
use dataset::NumericArray;
use ml_model::training::fit;
use ml_model::{FittedPreprocessor, ModelConfig, SensorModel, TrainingConfig, classification_score};
use sensor_structs::{
    ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact,
};
use tracing::info;

use crate::SensorError;

/// Fits the classifier on the transformed arrays and gates it on its scores.
pub struct ModelTrainer<'a> {
    config: ModelTrainerConfig,
    store: &'a ArtifactStore,
    fit_timeout: Duration,
}

impl<'a> ModelTrainer<'a> {
    #[must_use]
    pub const fn new(
        config: ModelTrainerConfig,
        store: &'a ArtifactStore,
        fit_timeout: Duration,
    ) -> Self {
        Self {
            config,
            store,
            fit_timeout,
        }
    }

    async fn load_array(&self, path: &str) -> Result<(NumericArray, Vec<u8>), SensorError> {
        let bytes = self.store.get(path).await?;
        let array = NumericArray::from_bytes(&bytes).with_context(|| format!("Failed to decode {path}"))?;
        Ok(array.split_target_column()?)
    }

    /// Checks the test score and the train/test gap.
    ///
    /// # Errors
    ///
    /// Fails with [`SensorError::ModelBelowExpectedScore`] or
    /// [`SensorError::Overfitting`].
    pub fn check_scores(
        &self,
        train: &ClassificationMetricArtifact,
        test: &ClassificationMetricArtifact,
    ) -> Result<(), SensorError> {
        if test.f1_score < self.config.expected_accuracy {
            return Err(SensorError::ModelBelowExpectedScore {
                score: test.f1_score,
                expected: self.config.expected_accuracy,
            });
        }

        let gap = (train.f1_score - test.f1_score).abs();
        if gap > self.config.overfitting_underfitting_threshold {
            return Err(SensorError::Overfitting {
                gap,
                threshold: self.config.overfitting_underfitting_threshold,
            });
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the arrays cannot be read, fitting fails or times
    /// out, or the fitted model fails [`ModelTrainer::check_scores`].
    pub async fn run(
        &self,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact, SensorError> {
        let (x_train, y_train) = self.load_array(&transformation.transformed_train_file_path).await?;
        let (x_test, y_test) = self.load_array(&transformation.transformed_test_file_path).await?;

        let object = self
            .store
            .get(&transformation.transformed_object_file_path)
            .await?;
        let fitted: FittedPreprocessor =
            serde_json::from_slice(&object).context("Failed to decode preprocessor")?;

        let training = TrainingConfig::new(ModelConfig::new(x_train.cols()))
            .with_epochs(self.config.epochs)
            .with_batch_size(self.config.batch_size)
            .with_learning_rate(self.config.learning_rate);

        info!(
            rows = x_train.rows(),
            features = x_train.cols(),
            epochs = training.epochs,
            "Fitting classifier"
        );

        let fit_config = training.clone();
        let task = tokio::task::spawn_blocking(move || {
            let fitted = fit(&x_train, &y_train, &fit_config);
            (fitted, x_train, y_train)
        });
        let (fitted_model, x_train, y_train) = tokio::time::timeout(self.fit_timeout, task)
            .await
            .map_err(|_| SensorError::FitTimedOut(self.fit_timeout))?
            .context("Model fitting task failed")?;
        let (classifier, output) = fitted_model?;

        let model = SensorModel::new(
            fitted.feature_names,
            fitted.preprocessor,
            training.model,
            classifier,
        );

        let train_metric = classification_score(&y_train, &model.predict_transformed(&x_train)?);
        let test_metric = classification_score(&y_test, &model.predict_transformed(&x_test)?);
        info!(
            train_f1 = train_metric.f1_score,
            test_f1 = test_metric.f1_score,
            final_loss = output.final_train_loss,
            "Classifier scored"
        );

        self.check_scores(&train_metric, &test_metric)?;

        self.store
            .put(&self.config.trained_model_file_path, model.to_bytes()?)
            .await?;

        let artifact = ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric_artifact: train_metric,
            test_metric_artifact: test_metric,
        };
        info!(?artifact, "Model trainer artifact created");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use config::TrainingPipelineConfig;

    use super::*;

    fn metric(f1_score: f64) -> ClassificationMetricArtifact {
        ClassificationMetricArtifact {
            f1_score,
            precision_score: f1_score,
            recall_score: f1_score,
        }
    }

    fn with_trainer(check: impl FnOnce(&ModelTrainer<'_>)) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::local(dir.path()).expect("store");
        let config = ModelTrainerConfig::new(&TrainingPipelineConfig::new(Local::now()));
        let trainer = ModelTrainer::new(config, &store, Duration::from_secs(60));
        check(&trainer);
    }

    #[test]
    fn test_low_test_score_is_rejected() {
        with_trainer(|trainer| {
            assert!(matches!(
                trainer.check_scores(&metric(0.7), &metric(0.55)),
                Err(SensorError::ModelBelowExpectedScore { .. })
            ));
        });
    }

    #[test]
    fn test_train_test_gap_is_rejected() {
        with_trainer(|trainer| {
            assert!(matches!(
                trainer.check_scores(&metric(0.95), &metric(0.85)),
                Err(SensorError::Overfitting { .. })
            ));
            assert!(trainer.check_scores(&metric(0.88), &metric(0.85)).is_ok());
        });
    }
}
