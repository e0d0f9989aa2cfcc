//! Repository functions for database operations.

use dataset::Document;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::StoredDocument;

/// Repository for raw sensor records.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lists every record of a collection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_by_collection(
        &self,
        collection: &str,
    ) -> Result<Vec<StoredDocument>, sqlx::Error> {
        sqlx::query_as::<_, StoredDocument>(
            r"
            SELECT id, collection, document, created_at
            FROM documents
            WHERE collection = $1
            ORDER BY seq
            ",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
    }

    /// Inserts records into a collection inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is inserted then.
    pub async fn create_many(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for document in documents {
            let result = sqlx::query(
                r"
                INSERT INTO documents (id, collection, document)
                VALUES ($1, $2, $3::json)
                ",
            )
            .bind(Uuid::new_v4())
            .bind(collection)
            .bind(document_json(document)?)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

/// Serializes a document for the `JSON` column, keys in their original order.
fn document_json(document: &Document) -> Result<String, sqlx::Error> {
    serde_json::to_string(document).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
