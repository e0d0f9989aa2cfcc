//! Stage output records.
//!
//! Each stage produces exactly one artifact per run. Artifacts are never
//! mutated once built; the next stage only reads them.

use serde::{Deserialize, Serialize};

/// Output of data ingestion: where the train/test snapshots were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub trained_file_path: String,
    pub test_file_path: String,
}

/// Output of data validation.
///
/// Downstream stages must not run when `validation_status` is false; the
/// orchestrator enforces this, not the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub validation_status: bool,
    pub valid_train_file_path: String,
    pub valid_test_file_path: String,
    /// Never populated: invalid rows are not quarantined.
    pub invalid_train_file_path: Option<String>,
    /// Never populated: invalid rows are not quarantined.
    pub invalid_test_file_path: Option<String>,
    pub drift_report_file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub transformed_object_file_path: String,
    pub transformed_train_file_path: String,
    pub transformed_test_file_path: String,
}

/// Binary classification scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetricArtifact {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: String,
    pub train_metric_artifact: ClassificationMetricArtifact,
    pub test_metric_artifact: ClassificationMetricArtifact,
}

/// Output of the comparison against the deployed model.
///
/// `improved_accuracy` is `None` exactly when no deployed model existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    pub is_model_accepted: bool,
    pub improved_accuracy: Option<f64>,
    pub best_model_path: Option<String>,
    pub trained_model_path: String,
    pub train_model_metric_artifact: ClassificationMetricArtifact,
    pub best_model_metric_artifact: Option<ClassificationMetricArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    /// Serving location the model resolver reads from.
    pub saved_model_path: String,
    /// Copy kept with the run's artifacts.
    pub model_file_path: String,
}
