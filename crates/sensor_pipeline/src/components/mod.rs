//! Pipeline stages and their collaborators.

mod data_ingestion;
mod data_transformation;
mod data_validation;
mod model_evaluation;
mod model_pusher;
mod model_resolver;
mod model_trainer;

pub use data_ingestion::DataIngestion;
pub use data_transformation::DataTransformation;
pub use data_validation::DataValidation;
pub use model_evaluation::{ModelEvaluation, evaluate_improvement};
pub use model_pusher::ModelPusher;
pub use model_resolver::SavedModelResolver;
pub use model_trainer::ModelTrainer;

use anyhow::Context;
use config::ArtifactStore;
use dataset::Table;

use crate::SensorError;

/// Reads a CSV snapshot from the store.
pub(crate) async fn read_table(store: &ArtifactStore, path: &str) -> Result<Table, SensorError> {
    let bytes = store.get(path).await?;
    let table = Table::from_csv_bytes(&bytes).with_context(|| format!("Failed to parse {path}"))?;
    Ok(table)
}

/// Writes a table to the store as CSV.
pub(crate) async fn write_table(
    store: &ArtifactStore,
    path: &str,
    table: &Table,
) -> Result<(), SensorError> {
    let bytes = table
        .to_csv_bytes()
        .with_context(|| format!("Failed to encode {path}"))?;
    store.put(path, bytes).await?;
    Ok(())
}
