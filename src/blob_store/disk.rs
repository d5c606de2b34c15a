/// Disk-backed document storage
use crate::{
    blob_store::DocumentBackend,
    error::{AppError, AppResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Stores each document under a two-character shard of its content
/// hash: `{base}/{id[0..2]}/{id}`. Writes land in a staging file and
/// are renamed into place, so a crashed upload never leaves a torn
/// document where a reader can find it.
#[derive(Clone)]
pub struct DiskDocumentBackend {
    base_path: PathBuf,
}

impl DiskDocumentBackend {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn document_path(&self, id: &str) -> PathBuf {
        // Ids are hex sha-256 in practice; the fallback shard only
        // exists so arbitrary ids cannot escape the base directory
        let shard = if id.len() >= 2 { &id[0..2] } else { "_" };
        self.base_path.join(shard).join(id)
    }
}

#[async_trait]
impl DocumentBackend for DiskDocumentBackend {
    async fn put(&self, id: &str, data: Vec<u8>) -> AppResult<()> {
        let path = self.document_path(id);
        let parent = path
            .parent()
            .ok_or_else(|| AppError::Storage(format!("No shard directory for {}", id)))?;

        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create shard directory: {}", e)))?;

        // Identical ids carry identical bytes, so clobbering an
        // existing file via the rename is harmless
        let staging = path.with_extension("partial");
        fs::write(&staging, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stage document {}: {}", id, e)))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to publish document {}: {}", id, e)))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Vec<u8>>> {
        match fs::read(self.document_path(id)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read document {}: {}",
                id, e
            ))),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        match fs::remove_file(self.document_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete document {}: {}",
                id, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_document() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        let id = "ab34cd56ef";
        let data = b"%PDF-1.4 exam paper".to_vec();

        backend.put(id, data.clone()).await.unwrap();
        assert_eq!(backend.get(id).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_put_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        backend.put("ab34cd56ef", b"bytes".to_vec()).await.unwrap();

        let staged = dir.path().join("ab").join("ab34cd56ef.partial");
        assert!(!staged.exists());
        assert!(dir.path().join("ab").join("ab34cd56ef").exists());
    }

    #[tokio::test]
    async fn test_put_same_id_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        backend.put("cd9900aa11", b"same".to_vec()).await.unwrap();
        backend.put("cd9900aa11", b"same".to_vec()).await.unwrap();
        assert_eq!(
            backend.get("cd9900aa11").await.unwrap(),
            Some(b"same".to_vec())
        );
    }

    #[tokio::test]
    async fn test_get_nonexistent_document() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_document() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        let id = "deadbeef01";
        backend.put(id, b"to be deleted".to_vec()).await.unwrap();

        backend.delete(id).await.unwrap();
        assert_eq!(backend.get(id).await.unwrap(), None);

        // Deleting again is a no-op
        backend.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = DiskDocumentBackend::new(dir.path().to_path_buf());

        let path = backend.document_path("ab34cd56ef");
        assert!(path.to_string_lossy().contains("/ab/"));
    }
}
