//! Store and operation discriminators.
//!
//! Every external call the engine makes is named by a [`StoreOp`]. The same
//! names are used in error context, fault injection and per-operation metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The backing store a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Relational store of document descriptors (existence witness).
    Metadata,
    /// Document store for JSON payloads.
    Content,
    /// Object store for binary payloads.
    Blob,
    /// Key/value cache.
    Cache,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Metadata => "metadata",
            StoreKind::Content => "content",
            StoreKind::Blob => "blob",
            StoreKind::Cache => "cache",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreOp {
    MetadataSave,
    MetadataGet,
    MetadataDelete,
    MetadataList,
    ContentSave,
    ContentGet,
    ContentDelete,
    BlobUpload,
    BlobDownload,
    BlobDelete,
}

impl StoreOp {
    /// All operations, in declaration order.
    pub const ALL: [StoreOp; 10] = [
        StoreOp::MetadataSave,
        StoreOp::MetadataGet,
        StoreOp::MetadataDelete,
        StoreOp::MetadataList,
        StoreOp::ContentSave,
        StoreOp::ContentGet,
        StoreOp::ContentDelete,
        StoreOp::BlobUpload,
        StoreOp::BlobDownload,
        StoreOp::BlobDelete,
    ];

    /// The store this operation targets.
    pub fn store(&self) -> StoreKind {
        match self {
            StoreOp::MetadataSave
            | StoreOp::MetadataGet
            | StoreOp::MetadataDelete
            | StoreOp::MetadataList => StoreKind::Metadata,
            StoreOp::ContentSave | StoreOp::ContentGet | StoreOp::ContentDelete => {
                StoreKind::Content
            }
            StoreOp::BlobUpload | StoreOp::BlobDownload | StoreOp::BlobDelete => StoreKind::Blob,
        }
    }

    /// Whether the operation mutates the store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreOp::MetadataSave
                | StoreOp::MetadataDelete
                | StoreOp::ContentSave
                | StoreOp::ContentDelete
                | StoreOp::BlobUpload
                | StoreOp::BlobDelete
        )
    }

    /// Metric label for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::MetadataSave => "save_document_metadata",
            StoreOp::MetadataGet => "get_document_metadata_by_id",
            StoreOp::MetadataDelete => "delete_document_metadata_by_id",
            StoreOp::MetadataList => "list_document_metadata",
            StoreOp::ContentSave => "save_document_content",
            StoreOp::ContentGet => "get_document_content_by_id",
            StoreOp::ContentDelete => "delete_document_content_by_id",
            StoreOp::BlobUpload => "upload_document_file",
            StoreOp::BlobDownload => "download_document_file",
            StoreOp::BlobDelete => "delete_document_file",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_op_maps_to_a_payload_or_metadata_store() {
        for op in StoreOp::ALL {
            assert_ne!(op.store(), StoreKind::Cache, "{op} should not target the cache");
        }
    }

    #[test]
    fn test_read_ops_are_not_mutations() {
        assert!(!StoreOp::MetadataGet.is_mutation());
        assert!(!StoreOp::MetadataList.is_mutation());
        assert!(!StoreOp::ContentGet.is_mutation());
        assert!(!StoreOp::BlobDownload.is_mutation());
        assert!(StoreOp::BlobDelete.is_mutation());
    }

    #[test]
    fn test_op_labels_are_unique() {
        let mut labels: Vec<_> = StoreOp::ALL.iter().map(|op| op.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), StoreOp::ALL.len());
    }
}
