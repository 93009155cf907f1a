//! Store contracts.
//!
//! The saga coordinator and the read router only ever talk to these traits.
//! Every method is a single call against a single store; none of them retry.

use async_trait::async_trait;
use docvault_core::{DocVaultResult, DocumentId, DocumentMeta, JsonMap, ListQuery};

/// Relational store of document descriptors.
///
/// A record here is the existence witness for a document.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a metadata record. Fails with `AlreadyExists` if the id is taken.
    async fn save(&self, meta: &DocumentMeta) -> DocVaultResult<()>;

    /// Fetch a record. Fails with `NotFound` if absent.
    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<DocumentMeta>;

    /// Remove a record. Fails with `NotFound` if absent.
    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()>;

    /// Records matching the query, ordered by name then newest first.
    async fn list(&self, query: &ListQuery) -> DocVaultResult<Vec<DocumentMeta>>;
}

/// Document store for JSON payloads.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `json` under `id`. The stored document carries `_id = id`.
    async fn save(&self, id: DocumentId, json: JsonMap) -> DocVaultResult<()>;

    /// Fetch the stored document, `_id` included. Fails with `NotFound` if absent.
    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<JsonMap>;

    /// Remove the stored document. Fails with `NotFound` if absent.
    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()>;
}

/// Object store for binary payloads, keyed by document id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, id: DocumentId, bytes: &[u8]) -> DocVaultResult<()>;

    /// Fails with `NotFound` if no object exists for `id`.
    async fn download(&self, id: DocumentId) -> DocVaultResult<Vec<u8>>;

    /// Remove the object. Removing an absent object succeeds.
    async fn delete(&self, id: DocumentId) -> DocVaultResult<()>;
}
