//! Sequences the stages of one training run.

use std::time::Duration;

use chrono::Utc;
use config::{
    ArtifactStore, DataIngestionConfig, DataTransformationConfig, DataValidationConfig,
    ModelEvaluationConfig, ModelPusherConfig, ModelTrainerConfig, TrainingPipelineConfig,
};
use database::DocumentSource;
use sensor_structs::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact, SchemaDescriptor,
};
use tracing::{error, info, instrument};

use crate::components::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher,
    ModelTrainer, SavedModelResolver,
};
use crate::{CancellationToken, PipelineStatus, SensorError, Stage};

/// Knobs of a run that are not part of the artifact layout.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub collection_name: String,
    /// Upper bound on the document store query.
    pub source_timeout: Duration,
    /// Upper bound on resampling one split.
    pub resample_timeout: Duration,
    /// Upper bound on fitting the classifier.
    pub fit_timeout: Duration,
    pub split_seed: Option<u64>,
    pub resample_seed: Option<u64>,
    pub epochs: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            collection_name: config::constants::DATA_INGESTION_COLLECTION_NAME.to_string(),
            source_timeout: Duration::from_secs(60),
            resample_timeout: Duration::from_secs(30 * 60),
            fit_timeout: Duration::from_secs(30 * 60),
            split_seed: None,
            resample_seed: None,
            epochs: None,
        }
    }
}

/// Every artifact of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run: TrainingPipelineConfig,
    pub data_ingestion: DataIngestionArtifact,
    pub data_validation: DataValidationArtifact,
    pub data_transformation: DataTransformationArtifact,
    pub model_trainer: ModelTrainerArtifact,
    pub model_evaluation: ModelEvaluationArtifact,
    pub model_pusher: ModelPusherArtifact,
}

/// Runs ingestion through promotion against an injected document source.
pub struct TrainPipeline<S> {
    source: S,
    store: ArtifactStore,
    schema: SchemaDescriptor,
    options: PipelineOptions,
    status: PipelineStatus,
    cancellation: CancellationToken,
}

impl<S: DocumentSource> TrainPipeline<S> {
    #[must_use]
    pub fn new(source: S, store: ArtifactStore, schema: SchemaDescriptor) -> Self {
        Self {
            source,
            store,
            schema,
            options: PipelineOptions::default(),
            status: PipelineStatus::new(),
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares a running flag with other pipelines.
    #[must_use]
    pub fn with_status(mut self, status: PipelineStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub const fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Runs every stage under a run directory named after the current time.
    ///
    /// # Errors
    ///
    /// See [`TrainPipeline::run_pipeline_with`].
    pub async fn run_pipeline(&self) -> Result<PipelineRun, SensorError> {
        self.run_pipeline_with(TrainingPipelineConfig::now()).await
    }

    /// Runs every stage under `run`.
    ///
    /// Artifacts of completed stages stay on disk when a later stage fails.
    ///
    /// # Errors
    ///
    /// Fails with [`SensorError::PipelineAlreadyRunning`] if the shared status
    /// is taken, [`SensorError::Cancelled`] if cancellation was requested
    /// before a stage, and otherwise [`SensorError::PipelineAborted`] naming
    /// the failed stage. A rejected model aborts the evaluation stage with
    /// [`SensorError::ModelNotAccepted`].
    #[instrument(skip_all, fields(run = %run.timestamp))]
    pub async fn run_pipeline_with(
        &self,
        run: TrainingPipelineConfig,
    ) -> Result<PipelineRun, SensorError> {
        let _guard = self.status.try_start()?;
        info!(artifact_dir = %run.artifact_dir, "Training pipeline started");

        let result = self.run_stages(run).await;
        match &result {
            Ok(outcome) => info!(
                saved_model = %outcome.model_pusher.saved_model_path,
                "Training pipeline finished"
            ),
            Err(e) => error!(error = %e, cause = %e.root(), "Training pipeline failed"),
        }
        result
    }

    async fn run_stages(&self, run: TrainingPipelineConfig) -> Result<PipelineRun, SensorError> {
        let data_ingestion = self.start_data_ingestion(&run).await?;
        let data_validation = self.start_data_validation(&run, &data_ingestion).await?;
        let data_transformation = self
            .start_data_transformation(&run, &data_validation)
            .await?;
        let model_trainer = self.start_model_trainer(&run, &data_transformation).await?;
        let model_evaluation = self
            .start_model_evaluation(&run, &data_validation, &model_trainer)
            .await?;
        let model_pusher = self.start_model_pusher(&run, &model_evaluation).await?;

        Ok(PipelineRun {
            run,
            data_ingestion,
            data_validation,
            data_transformation,
            model_trainer,
            model_evaluation,
            model_pusher,
        })
    }

    fn enter(&self, stage: Stage) -> Result<(), SensorError> {
        self.cancellation.check(stage)?;
        info!(%stage, "Stage started");
        Ok(())
    }

    async fn start_data_ingestion(
        &self,
        run: &TrainingPipelineConfig,
    ) -> Result<DataIngestionArtifact, SensorError> {
        let stage = Stage::DataIngestion;
        self.enter(stage)?;

        let mut config = DataIngestionConfig::new(run)
            .with_collection_name(self.options.collection_name.clone());
        if let Some(seed) = self.options.split_seed {
            config = config.with_split_seed(seed);
        }

        DataIngestion::new(
            config,
            &self.schema,
            &self.source,
            &self.store,
            self.options.source_timeout,
        )
        .run()
        .await
        .map_err(|e| SensorError::aborted(stage, e))
    }

    async fn start_data_validation(
        &self,
        run: &TrainingPipelineConfig,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, SensorError> {
        let stage = Stage::DataValidation;
        self.enter(stage)?;

        let artifact = DataValidation::new(DataValidationConfig::new(run), &self.schema, &self.store)
            .run(ingestion)
            .await
            .map_err(|e| SensorError::aborted(stage, e))?;

        if !artifact.validation_status {
            return Err(SensorError::aborted(
                stage,
                SensorError::SchemaValidation(vec!["validation status is false".to_string()]),
            ));
        }
        Ok(artifact)
    }

    async fn start_data_transformation(
        &self,
        run: &TrainingPipelineConfig,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact, SensorError> {
        let stage = Stage::DataTransformation;
        self.enter(stage)?;

        let mut config = DataTransformationConfig::new(run);
        if let Some(seed) = self.options.resample_seed {
            config = config.with_resample_seed(seed);
        }

        DataTransformation::new(
            config,
            &self.store,
            &self.cancellation,
            self.options.resample_timeout,
        )
        .run(validation)
        .await
        .map_err(|e| SensorError::aborted(stage, e))
    }

    async fn start_model_trainer(
        &self,
        run: &TrainingPipelineConfig,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact, SensorError> {
        let stage = Stage::ModelTrainer;
        self.enter(stage)?;

        let mut config = ModelTrainerConfig::new(run);
        if let Some(epochs) = self.options.epochs {
            config.epochs = epochs;
        }

        ModelTrainer::new(config, &self.store, self.options.fit_timeout)
            .run(transformation)
            .await
            .map_err(|e| SensorError::aborted(stage, e))
    }

    async fn start_model_evaluation(
        &self,
        run: &TrainingPipelineConfig,
        validation: &DataValidationArtifact,
        trainer: &ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact, SensorError> {
        let stage = Stage::ModelEvaluation;
        self.enter(stage)?;

        let resolver = SavedModelResolver::new(self.store.clone());
        let artifact = ModelEvaluation::new(ModelEvaluationConfig::new(run), &self.store, &resolver)
            .run(validation, trainer)
            .await
            .map_err(|e| SensorError::aborted(stage, e))?;

        if !artifact.is_model_accepted {
            info!(improved_accuracy = ?artifact.improved_accuracy, "Trained model is not better than the promoted one");
            return Err(SensorError::aborted(
                stage,
                SensorError::ModelNotAccepted {
                    improved_accuracy: artifact.improved_accuracy,
                },
            ));
        }
        Ok(artifact)
    }

    async fn start_model_pusher(
        &self,
        run: &TrainingPipelineConfig,
        evaluation: &ModelEvaluationArtifact,
    ) -> Result<ModelPusherArtifact, SensorError> {
        let stage = Stage::ModelPusher;
        self.enter(stage)?;

        let resolver = SavedModelResolver::new(self.store.clone());
        let latest = resolver
            .latest_timestamp()
            .await
            .map_err(|e| SensorError::aborted(stage, e))?;
        // Keep promotions strictly ordered even within the same second.
        let promoted_at = latest.map_or(Utc::now().timestamp(), |ts| Utc::now().timestamp().max(ts + 1));

        ModelPusher::new(ModelPusherConfig::new(run, promoted_at), &self.store)
            .run(evaluation)
            .await
            .map_err(|e| SensorError::aborted(stage, e))
    }
}
