//! Database model types.

use dataset::Document;
use sqlx::types::Json;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// One raw record of a collection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredDocument {
    pub id: Uuid,
    pub collection: String,
    pub document: Json<Document>,
    pub created_at: DateTime<Utc>,
}
