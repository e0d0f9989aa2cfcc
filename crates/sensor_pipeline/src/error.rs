use std::time::Duration;

use dataset::TableError;
use ml_model::ModelError;
use sensor_structs::UnknownLabel;

use crate::Stage;

/// Every way a pipeline run can fail.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("document store unavailable: {0}")]
    SourceUnavailable(String),

    #[error("collection {collection} has no records")]
    EmptySource { collection: String },

    #[error("schema validation failed: {}", .0.join("; "))]
    SchemaValidation(Vec<String>),

    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("trained model f1 {score:.4} is below the expected {expected:.4}")]
    ModelBelowExpectedScore { score: f64, expected: f64 },

    #[error("train/test f1 gap {gap:.4} exceeds {threshold:.4}")]
    Overfitting { gap: f64, threshold: f64 },

    #[error("trained model not accepted (improved accuracy: {improved_accuracy:?})")]
    ModelNotAccepted { improved_accuracy: Option<f64> },

    #[error("run cancelled before {stage}")]
    Cancelled { stage: Stage },

    #[error("a pipeline run is already in progress")]
    PipelineAlreadyRunning,

    #[error("model fitting did not finish within {0:?}")]
    FitTimedOut(Duration),

    #[error("resampling did not finish within {0:?}")]
    ResampleTimedOut(Duration),

    #[error(transparent)]
    Artifact(#[from] anyhow::Error),

    #[error("pipeline aborted in {stage} stage")]
    PipelineAborted {
        stage: Stage,
        #[source]
        source: Box<SensorError>,
    },
}

impl SensorError {
    /// Wraps a stage failure with the stage it happened in.
    #[must_use]
    pub fn aborted(stage: Stage, source: Self) -> Self {
        Self::PipelineAborted {
            stage,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through [`SensorError::PipelineAborted`].
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::PipelineAborted { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<TableError> for SensorError {
    fn from(error: TableError) -> Self {
        match error {
            TableError::UnknownLabel(label) => Self::UnknownLabel(label),
            other => Self::Artifact(other.into()),
        }
    }
}

impl From<ModelError> for SensorError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::Table(table) => table.into(),
            other => Self::Artifact(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_label_is_not_hidden_as_artifact_error() {
        let error: SensorError = TableError::UnknownLabel(UnknownLabel {
            label: "maybe".to_string(),
        })
        .into();
        assert!(matches!(error, SensorError::UnknownLabel(_)));
    }

    #[test]
    fn test_root_unwraps_aborted() {
        let error = SensorError::aborted(
            Stage::DataValidation,
            SensorError::SchemaValidation(vec!["bad".to_string()]),
        );
        assert_eq!(error.to_string(), "pipeline aborted in data_validation stage");
        assert!(matches!(error.root(), SensorError::SchemaValidation(v) if v.len() == 1));
    }
}
