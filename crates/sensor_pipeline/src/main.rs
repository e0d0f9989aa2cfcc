//! Sensor fault classifier training CLI.
//!
//! Loads sensor records into the document store, applies migrations and
//! runs the training pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Settings;
use database::{PgDocumentStore, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

/// Sensor fault classifier training pipeline
#[derive(Parser)]
#[command(name = "sensor")]
#[command(about = "Trains and promotes the APS sensor fault classifier")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the training pipeline end to end
    Train {
        /// Collection to train on (defaults to `SENSOR_COLLECTION`)
        #[arg(short, long)]
        collection: Option<String>,

        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Seed for the train/test split and resampling
        #[arg(short, long)]
        seed: Option<u64>,

        /// Timeout of the document store query, in seconds
        #[arg(long, default_value = "60")]
        source_timeout: u64,

        /// Timeout of resampling one split, in seconds
        #[arg(long, default_value = "1800")]
        resample_timeout: u64,

        /// Timeout of model fitting, in seconds
        #[arg(long, default_value = "1800")]
        fit_timeout: u64,
    },

    /// Load a CSV export into a collection
    LoadCsv {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Target collection (defaults to `SENSOR_COLLECTION`)
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env()?;
    let store = PgDocumentStore::connect(&settings.database_url).await?;

    let result = match cli.command {
        Commands::Train {
            collection,
            epochs,
            seed,
            source_timeout,
            resample_timeout,
            fit_timeout,
        } => {
            let options = commands::train::TrainOptions {
                collection: collection.unwrap_or_else(|| settings.collection_name.clone()),
                epochs,
                seed,
                source_timeout,
                resample_timeout,
                fit_timeout,
            };
            commands::train::run(&settings, store.clone(), options).await
        }
        Commands::LoadCsv { file, collection } => {
            let collection = collection.unwrap_or_else(|| settings.collection_name.clone());
            commands::load_csv::run(&store, &file, &collection).await
        }
        Commands::Migrate => run_migrations(store.repository().pool())
            .await
            .map(|()| info!("Migrations completed successfully"))
            .map_err(Into::into),
    };

    store.close().await;
    result
}
