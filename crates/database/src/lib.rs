mod import;
pub mod models;
mod repositories;
mod source;

pub use import::documents_from_csv;
pub use repositories::DocumentRepository;
pub use source::{DocumentSource, ID_FIELD, InMemoryDocumentStore, PgDocumentStore};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Errors raised by the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Creates a connection pool to the `PostgreSQL` database.
///
/// # Errors
///
/// Returns an error if the connection to the database fails.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
