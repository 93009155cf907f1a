//! Document cache over a pluggable backend.
//!
//! The cache holds what a read would serve: raw bytes for blobs, the
//! enveloped JSON for content documents. It never fails its caller. Backend
//! errors are logged at debug and read as a miss.

use super::keys::{meta_key, payload_key, FIELD_CREATED, FIELD_SIZE, FIELD_TYPE};
use super::traits::{CacheBackend, CacheHash, CacheResult, CacheStats};
use chrono::Utc;
use docvault_core::{ApiResponse, CacheError, DocumentId, Payload};
use std::sync::Arc;
use std::time::Duration;

/// A document served from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub size: u64,
    /// Unix seconds at which the entry was written.
    pub created: i64,
}

/// Bytes a reader is served for `payload`.
pub fn encode_payload(payload: &Payload) -> Result<Vec<u8>, CacheError> {
    match payload {
        Payload::Blob(bytes) => Ok(bytes.clone()),
        Payload::Json(map) => ApiResponse::data(map.clone())
            .to_bytes()
            .map_err(|e| CacheError::Serialization(e.to_string())),
    }
}

/// Cache-aside document cache.
#[derive(Clone)]
pub struct DocumentCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl DocumentCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Cache `payload` for `id`. Failures are logged and swallowed.
    pub async fn set(&self, id: DocumentId, mime: &str, payload: &Payload) {
        let result = match encode_payload(payload) {
            Ok(bytes) => self.try_set(id, mime, &bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(target: "docvault::cache", document_id = %id, error = %e, "cache set failed");
        }
    }

    /// Cache already-encoded bytes for `id`. Failures are logged and swallowed.
    pub async fn set_encoded(&self, id: DocumentId, mime: &str, bytes: &[u8]) {
        if let Err(e) = self.try_set(id, mime, bytes).await {
            tracing::debug!(target: "docvault::cache", document_id = %id, error = %e, "cache set failed");
        }
    }

    async fn try_set(&self, id: DocumentId, mime: &str, bytes: &[u8]) -> CacheResult<()> {
        let mut fields = CacheHash::new();
        fields.insert(FIELD_TYPE.to_string(), mime.to_string());
        fields.insert(FIELD_SIZE.to_string(), bytes.len().to_string());
        fields.insert(FIELD_CREATED.to_string(), Utc::now().timestamp().to_string());

        self.backend
            .set_bytes(&payload_key(id), bytes, self.ttl)
            .await?;
        self.backend.set_hash(&meta_key(id), &fields, self.ttl).await
    }

    /// Look up `id`. Any absence or malformation reads as a miss.
    pub async fn get(&self, id: DocumentId) -> Option<CachedDocument> {
        match self.try_get(id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(target: "docvault::cache", document_id = %id, error = %e, "cache get failed");
                None
            }
        }
    }

    async fn try_get(&self, id: DocumentId) -> CacheResult<Option<CachedDocument>> {
        let Some(fields) = self.backend.get_hash(&meta_key(id)).await? else {
            return Ok(None);
        };
        let Some(mime) = fields.get(FIELD_TYPE).filter(|m| !m.is_empty()) else {
            return Err(CacheError::Deserialization(format!(
                "meta hash for {} has no '{}' field",
                id, FIELD_TYPE
            )));
        };

        let Some(bytes) = self.backend.get_bytes(&payload_key(id)).await? else {
            return Ok(None);
        };

        let size = match fields.get(FIELD_SIZE) {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                CacheError::Deserialization(format!("bad '{}' field: {}", FIELD_SIZE, e))
            })?,
            None => bytes.len() as u64,
        };
        if size != bytes.len() as u64 {
            return Err(CacheError::Deserialization(format!(
                "payload for {} is {} bytes, meta says {}",
                id,
                bytes.len(),
                size
            )));
        }

        let created = match fields.get(FIELD_CREATED) {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                CacheError::Deserialization(format!("bad '{}' field: {}", FIELD_CREATED, e))
            })?,
            None => 0,
        };

        Ok(Some(CachedDocument {
            bytes,
            mime: mime.clone(),
            size,
            created,
        }))
    }

    /// Remove both keys for `id`. Failures are logged and swallowed.
    pub async fn delete(&self, id: DocumentId) {
        for key in [payload_key(id), meta_key(id)] {
            if let Err(e) = self.backend.delete(&key).await {
                tracing::debug!(target: "docvault::cache", document_id = %id, key = %key, error = %e, "cache delete failed");
            }
        }
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.backend.stats().await
    }
}
