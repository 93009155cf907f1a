//! In-memory store adapters.
//!
//! Full implementations of the store contracts backed by `HashMap`s, with
//! per-operation call counters and fault injection. Inspection helpers
//! (`contains`, `peek`, `len`) bypass both.

use crate::fault::{CallCounter, FaultInjector};
use crate::traits::{BlobStore, ContentStore, MetadataStore};
use async_trait::async_trait;
use docvault_core::{
    list_order, with_content_id, DocVaultResult, DocumentId, DocumentMeta, JsonMap, ListQuery,
    StorageError, StoreKind, StoreOp,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

fn not_found(store: StoreKind, id: DocumentId) -> StorageError {
    StorageError::NotFound { store, id }
}

// ============================================================================
// METADATA
// ============================================================================

/// In-memory metadata store.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Arc<RwLock<HashMap<DocumentId, DocumentMeta>>>,
    faults: FaultInjector,
    calls: CallCounter,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn calls(&self) -> &CallCounter {
        &self.calls
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.records
            .read()
            .map(|records| records.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn peek(&self, id: DocumentId) -> Option<DocumentMeta> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save(&self, meta: &DocumentMeta) -> DocVaultResult<()> {
        self.calls.record(StoreOp::MetadataSave);
        self.faults.check(StoreOp::MetadataSave, Some(meta.id))?;

        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if records.contains_key(&meta.id) {
            return Err(StorageError::AlreadyExists {
                store: StoreKind::Metadata,
                id: meta.id,
            }
            .into());
        }
        records.insert(meta.id, meta.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<DocumentMeta> {
        self.calls.record(StoreOp::MetadataGet);
        self.faults.check(StoreOp::MetadataGet, Some(id))?;

        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        records
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(StoreKind::Metadata, id).into())
    }

    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()> {
        self.calls.record(StoreOp::MetadataDelete);
        self.faults.check(StoreOp::MetadataDelete, Some(id))?;

        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(StoreKind::Metadata, id).into())
    }

    async fn list(&self, query: &ListQuery) -> DocVaultResult<Vec<DocumentMeta>> {
        self.calls.record(StoreOp::MetadataList);
        self.faults.check(StoreOp::MetadataList, None)?;

        let records = self
            .records
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut matching: Vec<DocumentMeta> = records
            .values()
            .filter(|meta| query.matches(meta))
            .cloned()
            .collect();
        matching.sort_by(list_order);

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

// ============================================================================
// CONTENT
// ============================================================================

/// In-memory content store.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    documents: Arc<RwLock<HashMap<DocumentId, JsonMap>>>,
    faults: FaultInjector,
    calls: CallCounter,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn calls(&self) -> &CallCounter {
        &self.calls
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.documents
            .read()
            .map(|documents| documents.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn peek(&self, id: DocumentId) -> Option<JsonMap> {
        self.documents
            .read()
            .ok()
            .and_then(|documents| documents.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .map(|documents| documents.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn save(&self, id: DocumentId, json: JsonMap) -> DocVaultResult<()> {
        self.calls.record(StoreOp::ContentSave);
        self.faults.check(StoreOp::ContentSave, Some(id))?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if documents.contains_key(&id) {
            return Err(StorageError::AlreadyExists {
                store: StoreKind::Content,
                id,
            }
            .into());
        }
        documents.insert(id, with_content_id(json, id));
        Ok(())
    }

    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<JsonMap> {
        self.calls.record(StoreOp::ContentGet);
        self.faults.check(StoreOp::ContentGet, Some(id))?;

        let documents = self
            .documents
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        documents
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(StoreKind::Content, id).into())
    }

    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()> {
        self.calls.record(StoreOp::ContentDelete);
        self.faults.check(StoreOp::ContentDelete, Some(id))?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        documents
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(StoreKind::Content, id).into())
    }
}

// ============================================================================
// BLOB
// ============================================================================

/// In-memory object store.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<RwLock<HashMap<DocumentId, Vec<u8>>>>,
    faults: FaultInjector,
    calls: CallCounter,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn calls(&self) -> &CallCounter {
        &self.calls
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn peek(&self, id: DocumentId) -> Option<Vec<u8>> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, id: DocumentId, bytes: &[u8]) -> DocVaultResult<()> {
        self.calls.record(StoreOp::BlobUpload);
        self.faults.check(StoreOp::BlobUpload, Some(id))?;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        objects.insert(id, bytes.to_vec());
        Ok(())
    }

    async fn download(&self, id: DocumentId) -> DocVaultResult<Vec<u8>> {
        self.calls.record(StoreOp::BlobDownload);
        self.faults.check(StoreOp::BlobDownload, Some(id))?;

        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        objects
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(StoreKind::Blob, id).into())
    }

    async fn delete(&self, id: DocumentId) -> DocVaultResult<()> {
        self.calls.record(StoreOp::BlobDelete);
        self.faults.check(StoreOp::BlobDelete, Some(id))?;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        objects.remove(&id);
        Ok(())
    }
}
