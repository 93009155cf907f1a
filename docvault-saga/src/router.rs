//! Cache-aside read path.
//!
//! `get_by_id` answers from the cache when it can and trusts a hit for its
//! TTL without revalidating. On a miss the metadata record decides which
//! payload store to ask. Whether a miss writes back to the cache is
//! configurable and off by default, so that only saves populate the cache.
//!
//! There is no per-document locking. A read racing a delete of the same
//! document may see the document, a not-found, or a stale cache entry until
//! the eviction lands. It never sees a partial payload.

use crate::metrics::SagaMetrics;
use crate::stores::{run_cache_task, DocumentStores};
use docvault_core::{
    ApiResponse, CacheWriteMode, DocVaultConfig, DocVaultResult, DocumentId, DocumentMeta,
    ListFilter,
};
use docvault_storage::DocumentCache;
use std::sync::Arc;

/// Where a served document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Store,
}

/// A payload ready to serve, with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedDocument {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub source: ReadSource,
}

/// Serves document reads and listings.
#[derive(Clone)]
pub struct ReadRouter {
    stores: DocumentStores,
    cache: DocumentCache,
    metrics: Arc<SagaMetrics>,
    repopulate_on_miss: bool,
    cache_write_mode: CacheWriteMode,
    list_default_limit: usize,
    list_max_limit: usize,
}

impl ReadRouter {
    pub fn new(
        stores: DocumentStores,
        cache: DocumentCache,
        metrics: Arc<SagaMetrics>,
        config: &DocVaultConfig,
    ) -> Self {
        Self {
            stores,
            cache,
            metrics,
            repopulate_on_miss: config.repopulate_on_miss,
            cache_write_mode: config.cache_write_mode,
            list_default_limit: config.list_default_limit,
            list_max_limit: config.list_max_limit,
        }
    }

    /// Payload bytes and mime type for `id`.
    pub async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<ServedDocument> {
        if let Some(hit) = self.cache.get(id).await {
            self.metrics.record_cache_hit();
            tracing::debug!(target: "docvault::read", document_id = %id, "cache hit");
            return Ok(ServedDocument {
                bytes: hit.bytes,
                mime: hit.mime,
                source: ReadSource::Cache,
            });
        }
        self.metrics.record_cache_miss();

        let meta = self
            .stores
            .metadata
            .get_by_id(id)
            .await
            .map_err(|e| e.into_document_not_found())?;

        let bytes = if meta.is_blob {
            self.stores.blobs.download(id).await?
        } else {
            let json = self.stores.content.get_by_id(id).await?;
            ApiResponse::data(json).to_bytes()?
        };

        tracing::debug!(
            target: "docvault::read",
            document_id = %id,
            is_blob = meta.is_blob,
            size = bytes.len(),
            "served from store"
        );

        if self.repopulate_on_miss {
            let cache = self.cache.clone();
            let mime = meta.mime.clone();
            let cached = bytes.clone();
            run_cache_task(self.cache_write_mode, async move {
                cache.set_encoded(id, &mime, &cached).await;
            })
            .await;
        }

        Ok(ServedDocument {
            bytes,
            mime: meta.mime,
            source: ReadSource::Store,
        })
    }

    /// Metadata records visible to the filter's login.
    pub async fn get_list(&self, filter: ListFilter) -> DocVaultResult<Vec<DocumentMeta>> {
        let query = filter.into_query(self.list_default_limit, self.list_max_limit)?;
        self.stores.metadata.list(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::DocVaultError;
    use docvault_storage::{
        InMemoryBlobStore, InMemoryCacheBackend, InMemoryContentStore, InMemoryMetadataStore,
    };
    use std::time::Duration;

    fn router() -> ReadRouter {
        let stores = DocumentStores::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryContentStore::new()),
            Arc::new(InMemoryBlobStore::new()),
        );
        let cache = DocumentCache::new(
            Arc::new(InMemoryCacheBackend::new()),
            Duration::from_secs(60),
        );
        ReadRouter::new(
            stores,
            cache,
            Arc::new(SagaMetrics::new()),
            &DocVaultConfig::for_tests(),
        )
    }

    #[tokio::test]
    async fn test_unknown_id_is_document_not_found() {
        let router = router();
        let id = DocumentId::now_v7();
        assert_eq!(
            router.get_by_id(id).await,
            Err(DocVaultError::DocumentNotFound { id })
        );
        assert_eq!(router.metrics.snapshot().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_list_requires_login() {
        let router = router();
        let result = router.get_list(ListFilter::default()).await;
        assert!(matches!(result, Err(DocVaultError::Validation(_))));
    }
}
