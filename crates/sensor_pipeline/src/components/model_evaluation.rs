use anyhow::Context;
use config::{ArtifactStore, ModelEvaluationConfig};
use ml_model::{SensorModel, classification_score};
use sensor_structs::{
    ClassificationMetricArtifact, DataValidationArtifact, ModelEvaluationArtifact,
    ModelTrainerArtifact,
};
use tracing::info;

use super::data_transformation::prepare_snapshot;
use super::{SavedModelResolver, read_table};
use crate::SensorError;

/// Acceptance rule against a promoted model.
///
/// Without a promoted model the trained one is accepted and the improvement
/// is `None`. Otherwise it is accepted iff its F1 beats the promoted F1 by
/// more than `change_threshold`.
#[must_use]
pub fn evaluate_improvement(
    trained: &ClassificationMetricArtifact,
    best: Option<&ClassificationMetricArtifact>,
    change_threshold: f64,
) -> (bool, Option<f64>) {
    match best {
        None => (true, None),
        Some(best) => {
            let improved_accuracy = trained.f1_score - best.f1_score;
            (improved_accuracy > change_threshold, Some(improved_accuracy))
        }
    }
}

/// Compares a freshly trained model with the promoted one.
pub struct ModelEvaluation<'a> {
    config: ModelEvaluationConfig,
    store: &'a ArtifactStore,
    resolver: &'a SavedModelResolver,
}

impl<'a> ModelEvaluation<'a> {
    #[must_use]
    pub const fn new(
        config: ModelEvaluationConfig,
        store: &'a ArtifactStore,
        resolver: &'a SavedModelResolver,
    ) -> Self {
        Self {
            config,
            store,
            resolver,
        }
    }

    async fn load_model(&self, path: &str) -> Result<SensorModel, SensorError> {
        let bytes = self
            .store
            .get(path)
            .await
            .map_err(|e| SensorError::ModelLoad {
                path: path.to_string(),
                reason: format!("{e:#}"),
            })?;

        SensorModel::from_bytes(&bytes).map_err(|e| SensorError::ModelLoad {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if a snapshot or either model cannot be loaded, or a
    /// label is outside the mapping.
    pub async fn run(
        &self,
        validation: &DataValidationArtifact,
        trainer: &ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact, SensorError> {
        let trained_model_path = trainer.trained_model_file_path.clone();

        let train = read_table(self.store, &validation.valid_train_file_path).await?;
        let test = read_table(self.store, &validation.valid_test_file_path).await?;
        let combined = prepare_snapshot(train.concat(&test)?)?;
        let trained_model = self.load_model(&trained_model_path).await?;

        let Some(best_model_path) = self.resolver.resolve().await? else {
            let (is_model_accepted, improved_accuracy) =
                evaluate_improvement(&trainer.test_metric_artifact, None, self.config.change_threshold);
            let artifact = ModelEvaluationArtifact {
                is_model_accepted,
                improved_accuracy,
                best_model_path: None,
                trained_model_path,
                train_model_metric_artifact: trainer.test_metric_artifact,
                best_model_metric_artifact: None,
            };
            info!(?artifact, "No promoted model, accepting trained model");
            return Ok(artifact);
        };

        let best_model = self.load_model(&best_model_path).await?;

        let trained_metric =
            classification_score(&combined.labels, &trained_model.predict(&combined.features)?);
        let best_metric =
            classification_score(&combined.labels, &best_model.predict(&combined.features)?);

        let (is_model_accepted, improved_accuracy) =
            evaluate_improvement(&trained_metric, Some(&best_metric), self.config.change_threshold);

        let artifact = ModelEvaluationArtifact {
            is_model_accepted,
            improved_accuracy,
            best_model_path: Some(best_model_path),
            trained_model_path,
            train_model_metric_artifact: trained_metric,
            best_model_metric_artifact: Some(best_metric),
        };

        let report = serde_yaml::to_string(&artifact).context("Failed to encode evaluation report")?;
        self.store
            .put(&self.config.report_file_path, report.into_bytes())
            .await?;

        info!(?artifact, "Model evaluation artifact created");
        Ok(artifact)
    }
}
