//! Where the ingestion stage reads raw records from.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use dataset::Document;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::{DocumentRepository, StoreError};

/// Store-internal identifier stripped from every exported record.
pub const ID_FIELD: &str = "_id";

/// A collection-addressed store of JSON records.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    /// Returns the records of `collection` as stored.
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Appends records to `collection`, returning how many were written.
    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError>;

    /// Returns the records of `collection` with [`ID_FIELD`] removed.
    async fn export_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = self.fetch_collection(collection).await?;
        for document in &mut documents {
            document.retain(|key, _| key != ID_FIELD);
        }

        debug!(collection, records = documents.len(), "Collection exported");
        Ok(documents)
    }
}

/// `PostgreSQL`-backed store. The pool is owned by the caller's handle and
/// must be closed explicitly with [`PgDocumentStore::close`].
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    repository: DocumentRepository,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            repository: DocumentRepository::new(pool),
        }
    }

    /// Connects to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = crate::create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn repository(&self) -> &DocumentRepository {
        &self.repository
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.repository.pool().close().await;
        info!("Document store closed");
    }
}

impl DocumentSource for PgDocumentStore {
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = self.repository.list_by_collection(collection).await?;
        Ok(rows.into_iter().map(|row| row.document.0).collect())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError> {
        Ok(self.repository.create_many(collection, documents).await?)
    }
}

/// Process-local store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    offline: bool,
    latency: Option<Duration>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails as unreachable.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Delays every fetch by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Document>>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl DocumentSource for InMemoryDocumentStore {
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError> {
        self.check_online()?;
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(documents);

        Ok(documents.len() as u64)
    }
}
