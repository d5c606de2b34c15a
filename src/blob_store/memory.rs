/// In-memory document storage backend, used by tests and fakes
use crate::{blob_store::DocumentBackend, error::AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memory-backed storage
#[derive(Clone, Default)]
pub struct MemoryDocumentBackend {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn put(&self, id: &str, data: Vec<u8>) -> AppResult<()> {
        self.blobs.write().await.insert(id.to_string(), data);
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.blobs.write().await.remove(id);
        Ok(())
    }
}
