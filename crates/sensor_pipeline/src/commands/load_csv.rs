//! Load command - imports a CSV export into the document store.

use std::path::Path;

use anyhow::{Context, Result};
use database::{DocumentSource, PgDocumentStore, documents_from_csv};
use tracing::info;

/// Runs the load-csv command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the insert fails.
pub async fn run(store: &PgDocumentStore, file: &Path, collection: &str) -> Result<()> {
    info!(file = %file.display(), collection, "Loading CSV");

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let documents = documents_from_csv(&bytes)?;

    let inserted = store.insert_documents(collection, &documents).await?;
    info!(collection, inserted, "Records inserted");
    Ok(())
}
