/// Document Storage System
///
/// Stores uploaded paper documents (PDF or image) as opaque blobs
/// addressed by content hash. Supports multiple backend
/// implementations (disk, in-memory).
pub mod disk;
pub mod memory;
pub mod store;

pub use disk::DiskDocumentBackend;
pub use memory::MemoryDocumentBackend;
pub use store::{DocumentStore, StoredDocument};

use crate::error::AppResult;
use async_trait::async_trait;

/// Content types the document store accepts at the boundary
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// Document storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob data.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Store a blob under its content-hash id. Re-storing an id is a
    /// no-op at worst: identical ids carry identical bytes.
    async fn put(&self, id: &str, data: Vec<u8>) -> AppResult<()>;

    /// Retrieve a blob by id
    async fn get(&self, id: &str) -> AppResult<Option<Vec<u8>>>;

    /// Delete a blob by id. Deleting a missing blob is not an error.
    async fn delete(&self, id: &str) -> AppResult<()>;
}
