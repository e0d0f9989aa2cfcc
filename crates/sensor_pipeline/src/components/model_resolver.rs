use config::constants::{MODEL_FILE_NAME, SAVED_MODEL_DIR};
use config::{ArtifactStore, join_path};
use tracing::debug;

use crate::SensorError;

/// Locates the currently promoted model under `saved_models/<timestamp>/`.
#[derive(Debug, Clone)]
pub struct SavedModelResolver {
    store: ArtifactStore,
    model_dir: String,
}

impl SavedModelResolver {
    #[must_use]
    pub fn new(store: ArtifactStore) -> Self {
        Self::with_model_dir(store, SAVED_MODEL_DIR)
    }

    #[must_use]
    pub fn with_model_dir(store: ArtifactStore, model_dir: impl Into<String>) -> Self {
        Self {
            store,
            model_dir: model_dir.into(),
        }
    }

    /// Largest numeric timestamp directory, ignoring other entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn latest_timestamp(&self) -> Result<Option<i64>, SensorError> {
        let dirs = self.store.list_dirs(&self.model_dir).await?;
        Ok(dirs.iter().filter_map(|d| d.parse::<i64>().ok()).max())
    }

    /// Model file of the newest timestamp directory, whether or not it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn get_best_model_path(&self) -> Result<Option<String>, SensorError> {
        Ok(self
            .latest_timestamp()
            .await?
            .map(|ts| join_path(&[&self.model_dir, &ts.to_string(), MODEL_FILE_NAME])))
    }

    /// Whether a promoted model can be loaded.
    ///
    /// False when the directory is missing or empty, or the newest timestamp
    /// directory has no model file.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn is_model_exists(&self) -> Result<bool, SensorError> {
        let Some(path) = self.get_best_model_path().await? else {
            debug!(dir = %self.model_dir, "No saved model directory");
            return Ok(false);
        };
        Ok(self.store.exists(&path).await?)
    }

    /// The promoted model path, if [`SavedModelResolver::is_model_exists`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn resolve(&self) -> Result<Option<String>, SensorError> {
        if !self.is_model_exists().await? {
            return Ok(None);
        }
        self.get_best_model_path().await
    }
}
