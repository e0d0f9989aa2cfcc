//! Per-run, per-stage layout of the artifact directory.
//!
//! Every path produced here is relative to the root of the [`ArtifactStore`]
//! and uses forward slashes, so it can be handed straight to `object_store`.
//!
//! [`ArtifactStore`]: crate::ArtifactStore

use chrono::{DateTime, Local};

use crate::constants::*;

/// Timestamp format of run directories, e.g. `03_14_2025_09_26_53`.
pub const RUN_TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Joins path segments with `/`, skipping empty segments.
#[must_use]
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Run context: roots all stage outputs under `artifact/<timestamp>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingPipelineConfig {
    pub pipeline_name: String,
    pub artifact_dir: String,
    pub timestamp: String,
}

impl TrainingPipelineConfig {
    /// Creates the run context for the given wall-clock time.
    #[must_use]
    pub fn new(timestamp: DateTime<Local>) -> Self {
        let timestamp = timestamp.format(RUN_TIMESTAMP_FORMAT).to_string();

        Self {
            pipeline_name: PIPELINE_NAME.to_string(),
            artifact_dir: join_path(&[ARTIFACT_DIR, &timestamp]),
            timestamp,
        }
    }

    /// Creates the run context for the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::new(Local::now())
    }

    /// Directory of a single stage inside this run.
    #[must_use]
    pub fn stage_dir(&self, stage_dir_name: &str) -> String {
        join_path(&[&self.artifact_dir, stage_dir_name])
    }
}

impl Default for TrainingPipelineConfig {
    fn default() -> Self {
        Self::now()
    }
}

#[derive(Debug, Clone)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: String,
    pub feature_store_file_path: String,
    pub training_file_path: String,
    pub testing_file_path: String,
    /// Fraction of rows that go to the test split.
    pub train_test_split_ratio: f64,
    pub collection_name: String,
    /// Seed for the train/test shuffle; `None` draws from the OS.
    pub split_seed: Option<u64>,
}

impl DataIngestionConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let data_ingestion_dir = pipeline.stage_dir(DATA_INGESTION_DIR_NAME);

        Self {
            feature_store_file_path: join_path(&[
                &data_ingestion_dir,
                DATA_INGESTION_FEATURE_STORE_DIR,
                FILE_NAME,
            ]),
            training_file_path: join_path(&[
                &data_ingestion_dir,
                DATA_INGESTION_INGESTED_DIR,
                TRAIN_FILE_NAME,
            ]),
            testing_file_path: join_path(&[
                &data_ingestion_dir,
                DATA_INGESTION_INGESTED_DIR,
                TEST_FILE_NAME,
            ]),
            data_ingestion_dir,
            train_test_split_ratio: DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO,
            collection_name: DATA_INGESTION_COLLECTION_NAME.to_string(),
            split_seed: None,
        }
    }

    #[must_use]
    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    #[must_use]
    pub const fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DataValidationConfig {
    pub data_validation_dir: String,
    pub valid_data_dir: String,
    pub invalid_data_dir: String,
    pub valid_train_file_path: String,
    pub valid_test_file_path: String,
    pub invalid_train_file_path: String,
    pub invalid_test_file_path: String,
    pub drift_report_file_path: String,
    /// KS p-value above which two columns count as the same distribution.
    pub drift_threshold: f64,
}

impl DataValidationConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let data_validation_dir = pipeline.stage_dir(DATA_VALIDATION_DIR_NAME);
        let valid_data_dir = join_path(&[&data_validation_dir, DATA_VALIDATION_VALID_DIR]);
        let invalid_data_dir = join_path(&[&data_validation_dir, DATA_VALIDATION_INVALID_DIR]);

        Self {
            valid_train_file_path: join_path(&[&valid_data_dir, TRAIN_FILE_NAME]),
            valid_test_file_path: join_path(&[&valid_data_dir, TEST_FILE_NAME]),
            invalid_train_file_path: join_path(&[&invalid_data_dir, TRAIN_FILE_NAME]),
            invalid_test_file_path: join_path(&[&invalid_data_dir, TEST_FILE_NAME]),
            drift_report_file_path: join_path(&[
                &data_validation_dir,
                DATA_VALIDATION_DRIFT_REPORT_DIR,
                DATA_VALIDATION_DRIFT_REPORT_FILE_NAME,
            ]),
            data_validation_dir,
            valid_data_dir,
            invalid_data_dir,
            drift_threshold: DATA_VALIDATION_DRIFT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: String,
    pub transformed_train_file_path: String,
    pub transformed_test_file_path: String,
    pub transformed_object_file_path: String,
    /// Seed for the SMOTE neighbour draws; `None` draws from the OS.
    pub resample_seed: Option<u64>,
}

impl DataTransformationConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let data_transformation_dir = pipeline.stage_dir(DATA_TRANSFORMATION_DIR_NAME);

        Self {
            transformed_train_file_path: join_path(&[
                &data_transformation_dir,
                DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR,
                TRANSFORMED_TRAIN_FILE_NAME,
            ]),
            transformed_test_file_path: join_path(&[
                &data_transformation_dir,
                DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR,
                TRANSFORMED_TEST_FILE_NAME,
            ]),
            transformed_object_file_path: join_path(&[
                &data_transformation_dir,
                DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR,
                PREPROCESSING_OBJECT_FILE_NAME,
            ]),
            data_transformation_dir,
            resample_seed: None,
        }
    }

    #[must_use]
    pub const fn with_resample_seed(mut self, seed: u64) -> Self {
        self.resample_seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: String,
    pub trained_model_file_path: String,
    /// Minimum F1 on the test split for a trained model to be kept.
    pub expected_accuracy: f64,
    /// Maximum allowed gap between train and test F1.
    pub overfitting_underfitting_threshold: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl ModelTrainerConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let model_trainer_dir = pipeline.stage_dir(MODEL_TRAINER_DIR_NAME);

        Self {
            trained_model_file_path: join_path(&[
                &model_trainer_dir,
                MODEL_TRAINER_TRAINED_MODEL_DIR,
                MODEL_FILE_NAME,
            ]),
            model_trainer_dir,
            expected_accuracy: MODEL_TRAINER_EXPECTED_SCORE,
            overfitting_underfitting_threshold: MODEL_TRAINER_OVERFITTING_UNDERFITTING_THRESHOLD,
            epochs: 30,
            batch_size: 64,
            learning_rate: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelEvaluationConfig {
    pub model_evaluation_dir: String,
    pub report_file_path: String,
    /// Minimum F1 improvement over the deployed model for acceptance.
    pub change_threshold: f64,
}

impl ModelEvaluationConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let model_evaluation_dir = pipeline.stage_dir(MODEL_EVALUATION_DIR_NAME);

        Self {
            report_file_path: join_path(&[&model_evaluation_dir, MODEL_EVALUATION_REPORT_NAME]),
            model_evaluation_dir,
            change_threshold: MODEL_EVALUATION_CHANGED_THRESHOLD_SCORE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelPusherConfig {
    pub model_pusher_dir: String,
    pub model_file_path: String,
    /// Serving location, `saved_models/<unix_timestamp>/model.json`.
    pub saved_model_path: String,
}

impl ModelPusherConfig {
    #[must_use]
    pub fn new(pipeline: &TrainingPipelineConfig, promoted_at: i64) -> Self {
        let model_pusher_dir = pipeline.stage_dir(MODEL_PUSHER_DIR_NAME);

        Self {
            model_file_path: join_path(&[&model_pusher_dir, SAVED_MODEL_DIR, MODEL_FILE_NAME]),
            saved_model_path: join_path(&[
                SAVED_MODEL_DIR,
                &promoted_at.to_string(),
                MODEL_FILE_NAME,
            ]),
            model_pusher_dir,
        }
    }
}
