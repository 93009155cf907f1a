//! Filesystem-backed object store.
//!
//! One file per document id under `<root>/<bucket>/`. Uploads are written to
//! a temporary file and renamed into place, so readers never see a partial
//! object.

use crate::traits::BlobStore;
use async_trait::async_trait;
use docvault_core::{DocVaultResult, DocumentId, StorageError, StoreKind, StoreOp};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Bucket used when none is configured.
pub const DEFAULT_BUCKET: &str = "document-files";

/// Object store over a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    bucket_dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) the default bucket under `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_bucket(root, DEFAULT_BUCKET).await
    }

    pub async fn open_bucket(root: impl AsRef<Path>, bucket: &str) -> Result<Self, StorageError> {
        let bucket_dir = root.as_ref().join(bucket);
        tokio::fs::create_dir_all(&bucket_dir)
            .await
            .map_err(|e| StorageError::QueryFailed {
                op: StoreOp::BlobUpload,
                reason: format!("cannot create bucket {}: {}", bucket_dir.display(), e),
            })?;
        Ok(Self { bucket_dir })
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn object_path(&self, id: DocumentId) -> PathBuf {
        self.bucket_dir.join(id.to_string())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, id: DocumentId, bytes: &[u8]) -> DocVaultResult<()> {
        let path = self.object_path(id);
        let temp_path = path.with_extension("part");

        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|e| StorageError::failed(StoreOp::BlobUpload, id, e.to_string()))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::failed(StoreOp::BlobUpload, id, e.to_string()).into());
        }
        Ok(())
    }

    async fn download(&self, id: DocumentId) -> DocVaultResult<Vec<u8>> {
        match tokio::fs::read(self.object_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                store: StoreKind::Blob,
                id,
            }
            .into()),
            Err(e) => Err(StorageError::failed(StoreOp::BlobDownload, id, e.to_string()).into()),
        }
    }

    async fn delete(&self, id: DocumentId) -> DocVaultResult<()> {
        match tokio::fs::remove_file(self.object_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::failed(StoreOp::BlobDelete, id, e.to_string()).into()),
        }
    }
}
