//! Per-operation observation of store calls.
//!
//! [`Observed`] wraps any store and records every call into a shared
//! [`StoreMetrics`]: count by status plus cumulative duration.

use crate::traits::{BlobStore, ContentStore, MetadataStore};
use async_trait::async_trait;
use docvault_core::{DocVaultResult, DocumentId, DocumentMeta, JsonMap, ListQuery, StoreOp};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Outcome label for an observed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStatus {
    Success,
    Failed,
    NotFound,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Failed => "failed",
            CallStatus::NotFound => "not_found",
        }
    }

    fn of<T>(result: &DocVaultResult<T>) -> Self {
        match result {
            Ok(_) => CallStatus::Success,
            Err(e) if e.is_not_found() => CallStatus::NotFound,
            Err(_) => CallStatus::Failed,
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    pub success: u64,
    pub failed: u64,
    pub not_found: u64,
    pub total_duration: Duration,
}

impl OpStats {
    pub fn calls(&self) -> u64 {
        self.success + self.failed + self.not_found
    }

    pub fn mean_duration(&self) -> Duration {
        match self.calls() {
            0 => Duration::ZERO,
            n => {
                let nanos = self.total_duration.as_nanos() / u128::from(n);
                Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
            }
        }
    }
}

/// Shared per-operation store metrics.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    ops: Mutex<HashMap<StoreOp, OpStats>>,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, op: StoreOp, status: CallStatus, elapsed: Duration) {
        if let Ok(mut ops) = self.ops.lock() {
            let stats = ops.entry(op).or_default();
            match status {
                CallStatus::Success => stats.success += 1,
                CallStatus::Failed => stats.failed += 1,
                CallStatus::NotFound => stats.not_found += 1,
            }
            stats.total_duration += elapsed;
        }
    }

    pub fn get(&self, op: StoreOp) -> OpStats {
        self.ops
            .lock()
            .ok()
            .and_then(|ops| ops.get(&op).copied())
            .unwrap_or_default()
    }

    /// All operations seen so far.
    pub fn snapshot(&self) -> BTreeMap<StoreOp, OpStats> {
        self.ops
            .lock()
            .map(|ops| ops.iter().map(|(op, stats)| (*op, *stats)).collect())
            .unwrap_or_default()
    }
}

/// A store wrapped with call observation.
#[derive(Debug, Clone)]
pub struct Observed<S> {
    inner: S,
    metrics: Arc<StoreMetrics>,
}

impl<S> Observed<S> {
    pub fn new(inner: S, metrics: Arc<StoreMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    async fn observe<T, F>(&self, op: StoreOp, call: F) -> DocVaultResult<T>
    where
        F: Future<Output = DocVaultResult<T>> + Send,
    {
        let start = Instant::now();
        let result = call.await;
        let elapsed = start.elapsed();
        let status = CallStatus::of(&result);
        self.metrics.record(op, status, elapsed);
        tracing::trace!(
            target: "docvault::store",
            op = %op,
            status = %status,
            elapsed_us = elapsed.as_micros() as u64,
            "store call"
        );
        result
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for Observed<S> {
    async fn save(&self, meta: &DocumentMeta) -> DocVaultResult<()> {
        self.observe(StoreOp::MetadataSave, self.inner.save(meta)).await
    }

    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<DocumentMeta> {
        self.observe(StoreOp::MetadataGet, self.inner.get_by_id(id)).await
    }

    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()> {
        self.observe(StoreOp::MetadataDelete, self.inner.delete_by_id(id))
            .await
    }

    async fn list(&self, query: &ListQuery) -> DocVaultResult<Vec<DocumentMeta>> {
        self.observe(StoreOp::MetadataList, self.inner.list(query)).await
    }
}

#[async_trait]
impl<S: ContentStore> ContentStore for Observed<S> {
    async fn save(&self, id: DocumentId, json: JsonMap) -> DocVaultResult<()> {
        self.observe(StoreOp::ContentSave, self.inner.save(id, json)).await
    }

    async fn get_by_id(&self, id: DocumentId) -> DocVaultResult<JsonMap> {
        self.observe(StoreOp::ContentGet, self.inner.get_by_id(id)).await
    }

    async fn delete_by_id(&self, id: DocumentId) -> DocVaultResult<()> {
        self.observe(StoreOp::ContentDelete, self.inner.delete_by_id(id))
            .await
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for Observed<S> {
    async fn upload(&self, id: DocumentId, bytes: &[u8]) -> DocVaultResult<()> {
        self.observe(StoreOp::BlobUpload, self.inner.upload(id, bytes)).await
    }

    async fn download(&self, id: DocumentId) -> DocVaultResult<Vec<u8>> {
        self.observe(StoreOp::BlobDownload, self.inner.download(id)).await
    }

    async fn delete(&self, id: DocumentId) -> DocVaultResult<()> {
        self.observe(StoreOp::BlobDelete, self.inner.delete(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBlobStore, InMemoryMetadataStore};

    #[tokio::test]
    async fn test_observed_records_status_per_operation() {
        let metrics = Arc::new(StoreMetrics::new());
        let store = Observed::new(InMemoryBlobStore::new(), metrics.clone());
        let id = DocumentId::now_v7();

        store.upload(id, b"x").await.unwrap();
        store.download(id).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.download(id).await.is_err());

        store.inner().faults().fail_once(StoreOp::BlobUpload);
        assert!(store.upload(id, b"x").await.is_err());

        let upload = metrics.get(StoreOp::BlobUpload);
        assert_eq!(upload.success, 1);
        assert_eq!(upload.failed, 1);

        let download = metrics.get(StoreOp::BlobDownload);
        assert_eq!(download.success, 1);
        assert_eq!(download.not_found, 1);
        assert_eq!(download.calls(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_lists_only_seen_operations() {
        let metrics = Arc::new(StoreMetrics::new());
        let store = Observed::new(InMemoryMetadataStore::new(), metrics.clone());
        assert!(store.get_by_id(DocumentId::now_v7()).await.is_err());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&StoreOp::MetadataGet].not_found, 1);
    }

    #[test]
    fn test_mean_duration_past_u32_call_counts() {
        let stats = OpStats {
            success: 1 << 32,
            total_duration: Duration::from_secs(1 << 32),
            ..OpStats::default()
        };
        assert_eq!(stats.mean_duration(), Duration::from_secs(1));

        let stats = OpStats {
            success: 3,
            failed: 1,
            total_duration: Duration::from_millis(10),
            ..OpStats::default()
        };
        assert_eq!(stats.mean_duration(), Duration::from_micros(2500));
        assert_eq!(OpStats::default().mean_duration(), Duration::ZERO);
    }

    #[test]
    fn test_call_status_labels() {
        assert_eq!(CallStatus::Success.as_str(), "success");
        assert_eq!(CallStatus::Failed.as_str(), "failed");
        assert_eq!(CallStatus::NotFound.as_str(), "not_found");
    }
}
