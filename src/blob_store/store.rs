/// High-level document store
///
/// Wraps a backend with the boundary checks the rest of the system
/// relies on: content-type allowlist and maximum upload size. Ids are
/// the hex sha-256 of the content, so replacing a document with
/// identical bytes is a natural no-op at the storage layer.
use crate::{
    blob_store::{DocumentBackend, ALLOWED_CONTENT_TYPES},
    error::{AppError, AppResult},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Reference to a stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub content_type: String,
    pub size: usize,
}

/// Document store with boundary enforcement
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    max_size: usize,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, max_size: usize) -> Self {
        Self { backend, max_size }
    }

    /// Store document bytes, returning the content-addressed reference.
    ///
    /// Rejects disallowed content types and oversized uploads before
    /// anything touches the backend.
    pub async fn put(&self, data: Vec<u8>, content_type: &str) -> AppResult<StoredDocument> {
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported media type: {} (only PDF and images are allowed)",
                content_type
            )));
        }

        if data.is_empty() {
            return Err(AppError::Validation("File is required".to_string()));
        }

        if data.len() > self.max_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {} bytes",
                self.max_size
            )));
        }

        let id = content_id(&data);
        let size = data.len();
        self.backend.put(&id, data).await?;

        Ok(StoredDocument {
            id,
            content_type: content_type.to_string(),
            size,
        })
    }

    /// Retrieve document bytes by id
    pub async fn get(&self, id: &str) -> AppResult<Option<Vec<u8>>> {
        self.backend.get(id).await
    }

    /// Request deletion of a document
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.backend.delete(id).await
    }
}

/// Hex sha-256 of the content
fn content_id(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
