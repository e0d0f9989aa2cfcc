//! Train command - runs the training pipeline.

use std::time::Duration;

use anyhow::{Context, Result};
use config::{ArtifactStore, Settings};
use database::PgDocumentStore;
use sensor_pipeline::{PipelineOptions, TrainPipeline};
use sensor_structs::SchemaDescriptor;
use tracing::info;

/// Command-line overrides for a training run.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub collection: String,
    pub epochs: Option<usize>,
    pub seed: Option<u64>,
    pub source_timeout: u64,
    pub resample_timeout: u64,
    pub fit_timeout: u64,
}

/// Runs the train command.
///
/// # Errors
///
/// Returns an error if the schema cannot be loaded or any stage fails.
pub async fn run(settings: &Settings, source: PgDocumentStore, options: TrainOptions) -> Result<()> {
    let schema = SchemaDescriptor::load(&settings.schema_path).with_context(|| {
        format!("Failed to load schema {}", settings.schema_path.display())
    })?;
    let store = ArtifactStore::local(&settings.base_path)?;

    let pipeline = TrainPipeline::new(source, store, schema).with_options(PipelineOptions {
        collection_name: options.collection,
        source_timeout: Duration::from_secs(options.source_timeout),
        resample_timeout: Duration::from_secs(options.resample_timeout),
        fit_timeout: Duration::from_secs(options.fit_timeout),
        split_seed: options.seed,
        resample_seed: options.seed,
        epochs: options.epochs,
    });

    let outcome = pipeline.run_pipeline().await?;

    info!(
        run = %outcome.run.artifact_dir,
        test_f1 = outcome.model_trainer.test_metric_artifact.f1_score,
        improved_accuracy = ?outcome.model_evaluation.improved_accuracy,
        saved_model = %outcome.model_pusher.saved_model_path,
        "Model promoted"
    );
    Ok(())
}
