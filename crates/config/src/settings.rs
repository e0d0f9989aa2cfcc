use std::path::PathBuf;

use anyhow::Context;

use crate::constants::{DATA_INGESTION_COLLECTION_NAME, SCHEMA_FILE_PATH};

/// Returns the root directory of the artifact store.
#[must_use]
pub fn get_base_path() -> PathBuf {
    dotenvy::dotenv().ok();

    std::env::var("SENSOR_BASE_PATH").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

/// Application settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Document store connection URL
    pub database_url: String,

    /// Root of the artifact store
    pub base_path: PathBuf,

    /// Schema descriptor file
    pub schema_path: PathBuf,

    /// Collection holding the sensor records
    pub collection_name: String,
}

impl Settings {
    /// Loads settings from environment variables.
    ///
    /// Required environment variables:
    /// - `DATABASE_URL`: `PostgreSQL` connection string of the document store
    ///
    /// Optional environment variables:
    /// - `SENSOR_BASE_PATH`: artifact store root (default: `.`)
    /// - `SENSOR_SCHEMA_PATH`: schema descriptor (default: `config/schema.yaml`)
    /// - `SENSOR_COLLECTION`: source collection (default: `car`)
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

        Ok(Self {
            database_url,
            base_path: get_base_path(),
            schema_path: std::env::var("SENSOR_SCHEMA_PATH")
                .map_or_else(|_| PathBuf::from(SCHEMA_FILE_PATH), PathBuf::from),
            collection_name: std::env::var("SENSOR_COLLECTION")
                .unwrap_or_else(|_| DATA_INGESTION_COLLECTION_NAME.to_string()),
        })
    }
}
