use config::{ArtifactStore, ModelPusherConfig};
use sensor_structs::{ModelEvaluationArtifact, ModelPusherArtifact};
use tracing::info;

use crate::SensorError;

/// Copies an accepted model to the run directory and the serving location.
pub struct ModelPusher<'a> {
    config: ModelPusherConfig,
    store: &'a ArtifactStore,
}

impl<'a> ModelPusher<'a> {
    #[must_use]
    pub const fn new(config: ModelPusherConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    /// # Errors
    ///
    /// Returns an error if either copy fails.
    pub async fn run(
        &self,
        evaluation: &ModelEvaluationArtifact,
    ) -> Result<ModelPusherArtifact, SensorError> {
        let trained = &evaluation.trained_model_path;

        self.store.copy(trained, &self.config.model_file_path).await?;
        self.store.copy(trained, &self.config.saved_model_path).await?;

        let artifact = ModelPusherArtifact {
            saved_model_path: self.config.saved_model_path.clone(),
            model_file_path: self.config.model_file_path.clone(),
        };
        info!(?artifact, "Model pusher artifact created");
        Ok(artifact)
    }
}
