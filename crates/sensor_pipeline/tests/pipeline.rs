//! End-to-end runs against an in-memory document store.

use std::time::Duration;

use chrono::{Local, TimeZone};
use config::{
    ArtifactStore, DataIngestionConfig, DataValidationConfig, TrainingPipelineConfig,
};
use database::{DocumentSource, InMemoryDocumentStore};
use dataset::{Document, Table};
use sensor_pipeline::components::{DataIngestion, DataValidation};
use sensor_pipeline::{
    CancellationToken, PipelineOptions, PipelineStatus, SensorError, Stage, TrainPipeline,
};
use sensor_structs::SchemaDescriptor;
use serde_json::json;
use tempfile::TempDir;

const COLLECTION: &str = "car";

const SCHEMA: &str = "\
columns:
  - class
  - aa_000
  - ab_000
  - ac_000
numerical_columns:
  - aa_000
  - ab_000
  - ac_000
drop_columns:
  - br_000
  - bs_000
";

fn schema() -> SchemaDescriptor {
    SchemaDescriptor::from_yaml_str(SCHEMA).expect("schema")
}

fn run_at(second: u32) -> TrainingPipelineConfig {
    let ts = Local
        .with_ymd_and_hms(2025, 3, 14, 9, 26, second)
        .single()
        .expect("valid local time");
    TrainingPipelineConfig::new(ts)
}

fn options() -> PipelineOptions {
    PipelineOptions {
        collection_name: COLLECTION.to_string(),
        split_seed: Some(7),
        resample_seed: Some(11),
        epochs: Some(15),
        ..PipelineOptions::default()
    }
}

/// Two well separated classes, one in five positive, with a few `na` cells.
fn sensor_records(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let positive = i % 5 == 0;
            let noise = ((i * 37) % 100) as f64 / 100.0;
            let offset = if positive { 10.0 } else { 0.0 };

            let ab = if i % 50 == 3 {
                json!("na")
            } else {
                json!(offset + noise * 0.5)
            };

            let record = json!({
                "_id": format!("rec-{i}"),
                "class": if positive { "pos" } else { "neg" },
                "aa_000": offset + noise,
                "ab_000": ab,
                "ac_000": (i % 7) as f64,
                "br_000": 1.0,
            });
            match record {
                serde_json::Value::Object(map) => map,
                _ => unreachable!("record literal is an object"),
            }
        })
        .collect()
}

async fn seeded_source(records: Vec<Document>) -> InMemoryDocumentStore {
    let source = InMemoryDocumentStore::new();
    source
        .insert_documents(COLLECTION, &records)
        .await
        .expect("insert");
    source
}

fn artifact_store() -> (TempDir, ArtifactStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ArtifactStore::local(dir.path()).expect("store");
    (dir, store)
}

fn aborted_in(error: &SensorError) -> Option<Stage> {
    match error {
        SensorError::PipelineAborted { stage, .. } => Some(*stage),
        _ => None,
    }
}

#[tokio::test]
async fn test_ingestion_drops_schema_columns_and_splits() {
    let source = seeded_source(sensor_records(1000)).await;
    let (_dir, store) = artifact_store();
    let schema = schema();
    let run = run_at(0);

    let config = DataIngestionConfig::new(&run)
        .with_collection_name(COLLECTION)
        .with_split_seed(7);
    let artifact = DataIngestion::new(config.clone(), &schema, &source, &store, Duration::from_secs(5))
        .run()
        .await
        .expect("ingestion");

    let feature_store = Table::from_csv_bytes(
        &store.get(&config.feature_store_file_path).await.expect("feature store"),
    )
    .expect("csv");
    assert_eq!(feature_store.n_rows(), 1000);
    assert!(!feature_store.contains("_id"));
    assert!(feature_store.contains("br_000"));

    let train = Table::from_csv_bytes(&store.get(&artifact.trained_file_path).await.expect("train"))
        .expect("csv");
    let test = Table::from_csv_bytes(&store.get(&artifact.test_file_path).await.expect("test"))
        .expect("csv");

    assert!(!train.contains("br_000"));
    assert!(!test.contains("br_000"));
    assert_eq!(train.n_cols(), 4);
    assert_eq!(test.n_rows(), 200);
    assert_eq!(train.n_rows() + test.n_rows(), 1000);
}

#[tokio::test]
async fn test_full_run_promotes_then_compares_against_promoted_model() {
    let source = seeded_source(sensor_records(1000)).await;
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(source, store.clone(), schema()).with_options(options());

    let first = pipeline
        .run_pipeline_with(run_at(1))
        .await
        .expect("first run");

    assert!(first.model_evaluation.is_model_accepted);
    assert_eq!(first.model_evaluation.improved_accuracy, None);
    assert!(first.model_trainer.test_metric_artifact.f1_score >= 0.6);
    assert!(store.exists(&first.model_pusher.saved_model_path).await.expect("exists"));
    assert!(store.exists(&first.model_pusher.model_file_path).await.expect("exists"));
    assert!(
        store
            .exists(&first.data_validation.drift_report_file_path)
            .await
            .expect("exists")
    );

    match pipeline.run_pipeline_with(run_at(2)).await {
        Ok(second) => {
            let improved = second
                .model_evaluation
                .improved_accuracy
                .expect("a promoted model existed");
            assert!(improved >= 0.02);
            assert_ne!(
                second.model_pusher.saved_model_path,
                first.model_pusher.saved_model_path
            );
        }
        Err(error) => {
            assert_eq!(aborted_in(&error), Some(Stage::ModelEvaluation));
            assert!(matches!(
                error.root(),
                SensorError::ModelNotAccepted {
                    improved_accuracy: Some(improved)
                } if *improved < 0.02
            ));
            let report = run_at(2).stage_dir("model_evaluation") + "/report.yaml";
            assert!(store.exists(&report).await.expect("exists"));
        }
    }

    assert!(!pipeline.status().is_running());
}

#[tokio::test]
async fn test_schema_violation_aborts_validation() {
    let mut records = sensor_records(200);
    for record in &mut records {
        record.insert("zz_999".to_string(), json!(0.0));
    }
    let source = seeded_source(records).await;
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(source, store.clone(), schema()).with_options(options());
    let run = run_at(3);

    let error = pipeline
        .run_pipeline_with(run.clone())
        .await
        .expect_err("extra column must fail validation");

    assert_eq!(aborted_in(&error), Some(Stage::DataValidation));
    assert!(matches!(error.root(), SensorError::SchemaValidation(v) if v.len() == 2));

    let drift_report = DataValidationConfig::new(&run).drift_report_file_path;
    assert!(!store.exists(&drift_report).await.expect("exists"));
}

#[tokio::test]
async fn test_drift_report_is_reproducible() {
    let source = seeded_source(sensor_records(500)).await;
    let (_dir, store) = artifact_store();
    let schema = schema();

    let mut reports = Vec::new();
    for second in [4, 5] {
        let run = run_at(second);
        let ingestion = DataIngestion::new(
            DataIngestionConfig::new(&run)
                .with_collection_name(COLLECTION)
                .with_split_seed(3),
            &schema,
            &source,
            &store,
            Duration::from_secs(5),
        )
        .run()
        .await
        .expect("ingestion");

        let validation = DataValidation::new(DataValidationConfig::new(&run), &schema, &store)
            .run(&ingestion)
            .await
            .expect("validation");
        assert!(validation.validation_status);

        reports.push(
            store
                .get(&validation.drift_report_file_path)
                .await
                .expect("report"),
        );
    }

    assert_eq!(reports[0], reports[1]);
    let yaml = String::from_utf8(reports[0].to_vec()).expect("utf8");
    assert!(yaml.contains("aa_000"));
    assert!(!yaml.contains("class"));
}

#[tokio::test]
async fn test_empty_collection_fails_ingestion() {
    let (_dir, store) = artifact_store();
    let pipeline =
        TrainPipeline::new(InMemoryDocumentStore::new(), store, schema()).with_options(options());

    let error = pipeline
        .run_pipeline_with(run_at(6))
        .await
        .expect_err("empty source");

    assert_eq!(aborted_in(&error), Some(Stage::DataIngestion));
    assert!(matches!(error.root(), SensorError::EmptySource { collection } if collection == COLLECTION));
}

#[tokio::test]
async fn test_unreachable_source_fails_ingestion() {
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(InMemoryDocumentStore::offline(), store, schema())
        .with_options(options());

    let error = pipeline
        .run_pipeline_with(run_at(7))
        .await
        .expect_err("offline source");

    assert_eq!(aborted_in(&error), Some(Stage::DataIngestion));
    assert!(matches!(error.root(), SensorError::SourceUnavailable(_)));
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let source = seeded_source(sensor_records(50))
        .await
        .with_latency(Duration::from_millis(500));
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(source, store, schema()).with_options(PipelineOptions {
        source_timeout: Duration::from_millis(20),
        ..options()
    });

    let error = pipeline
        .run_pipeline_with(run_at(8))
        .await
        .expect_err("timeout");

    assert!(matches!(error.root(), SensorError::SourceUnavailable(msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_concurrent_run_is_refused() {
    let (_dir, store) = artifact_store();
    let status = PipelineStatus::new();
    let pipeline = TrainPipeline::new(seeded_source(sensor_records(50)).await, store, schema())
        .with_options(options())
        .with_status(status.clone());

    let _held = status.try_start().expect("first start");
    let error = pipeline
        .run_pipeline_with(run_at(9))
        .await
        .expect_err("already running");

    assert!(matches!(error, SensorError::PipelineAlreadyRunning));
    assert!(status.is_running());
}

#[tokio::test]
async fn test_cancelled_run_stops_before_first_stage() {
    let (dir, store) = artifact_store();
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let pipeline = TrainPipeline::new(seeded_source(sensor_records(50)).await, store, schema())
        .with_options(options())
        .with_cancellation(cancellation);

    let error = pipeline
        .run_pipeline_with(run_at(10))
        .await
        .expect_err("cancelled");

    assert!(matches!(
        error,
        SensorError::Cancelled {
            stage: Stage::DataIngestion
        }
    ));
    assert!(!dir.path().join("artifact").exists());
    assert!(!pipeline.status().is_running());
}

#[tokio::test]
async fn test_unknown_label_aborts_transformation() {
    let mut records = sensor_records(200);
    for record in &mut records {
        record.insert("class".to_string(), json!("maybe"));
    }
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(seeded_source(records).await, store, schema())
        .with_options(options());

    let error = pipeline
        .run_pipeline_with(run_at(11))
        .await
        .expect_err("unknown label");

    assert_eq!(aborted_in(&error), Some(Stage::DataTransformation));
    assert!(matches!(error.root(), SensorError::UnknownLabel(label) if label.label == "maybe"));
}

#[tokio::test]
async fn test_resample_timeout_aborts_transformation() {
    let (_dir, store) = artifact_store();
    let pipeline = TrainPipeline::new(seeded_source(sensor_records(2000)).await, store, schema())
        .with_options(PipelineOptions {
            resample_timeout: Duration::ZERO,
            ..options()
        });

    let error = pipeline
        .run_pipeline_with(run_at(12))
        .await
        .expect_err("resample timeout");

    assert_eq!(aborted_in(&error), Some(Stage::DataTransformation));
    assert!(matches!(error.root(), SensorError::ResampleTimedOut(_)));
}
