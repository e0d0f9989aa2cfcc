//! Fixed names and defaults shared by every stage of the training pipeline.

pub const PIPELINE_NAME: &str = "sensor";
pub const ARTIFACT_DIR: &str = "artifact";

/// Label column of the sensor dataset.
pub const TARGET_COLUMN: &str = "class";

pub const FILE_NAME: &str = "sensor.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.arr";
pub const TRANSFORMED_TEST_FILE_NAME: &str = "test.arr";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.json";
pub const MODEL_FILE_NAME: &str = "model.json";

pub const SCHEMA_FILE_PATH: &str = "config/schema.yaml";
pub const SAVED_MODEL_DIR: &str = "saved_models";

// Data ingestion
pub const DATA_INGESTION_COLLECTION_NAME: &str = "car";
pub const DATA_INGESTION_DIR_NAME: &str = "data_ingestion";
pub const DATA_INGESTION_FEATURE_STORE_DIR: &str = "feature_store";
pub const DATA_INGESTION_INGESTED_DIR: &str = "ingested";
pub const DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO: f64 = 0.2;

// Data validation
pub const DATA_VALIDATION_DIR_NAME: &str = "data_validation";
pub const DATA_VALIDATION_VALID_DIR: &str = "validated";
pub const DATA_VALIDATION_INVALID_DIR: &str = "invalid";
pub const DATA_VALIDATION_DRIFT_REPORT_DIR: &str = "drift_report";
pub const DATA_VALIDATION_DRIFT_REPORT_FILE_NAME: &str = "report.yaml";
pub const DATA_VALIDATION_DRIFT_THRESHOLD: f64 = 0.05;

// Data transformation
pub const DATA_TRANSFORMATION_DIR_NAME: &str = "data_transformation";
pub const DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR: &str = "transformed";
pub const DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR: &str = "transformed_object";

// Model trainer
pub const MODEL_TRAINER_DIR_NAME: &str = "model_trainer";
pub const MODEL_TRAINER_TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_TRAINER_EXPECTED_SCORE: f64 = 0.6;
pub const MODEL_TRAINER_OVERFITTING_UNDERFITTING_THRESHOLD: f64 = 0.05;

// Model evaluation
pub const MODEL_EVALUATION_DIR_NAME: &str = "model_evaluation";
pub const MODEL_EVALUATION_REPORT_NAME: &str = "report.yaml";
pub const MODEL_EVALUATION_CHANGED_THRESHOLD_SCORE: f64 = 0.02;

// Model pusher
pub const MODEL_PUSHER_DIR_NAME: &str = "model_pusher";
