//! DocVault Saga - Cross-Store Consistency Engine
//!
//! Keeps a document's metadata record, its payload (blob or JSON) and its
//! cache entry consistent without a distributed transaction:
//!
//! - [`SagaCoordinator`] runs save and delete as compensating sagas, each an
//!   explicit [`SagaRun`] through the [`state`] machine
//! - [`ReadRouter`] serves reads cache-first and dispatches misses by the
//!   metadata record's `is_blob` flag
//! - [`DurableExecutor`] lets a caller wrap either saga in its own retry policy
//!
//! # Example
//!
//! ```ignore
//! let config = DocVaultConfig::from_env();
//! let engine = DocVault::new(stores, cache_backend, &config);
//!
//! let meta = engine.coordinator().save(NewDocument::json("invoice", json)).await?;
//! let served = engine.router().get_by_id(meta.id).await?;
//! engine.coordinator().delete(meta.id).await?;
//! ```

pub mod coordinator;
pub mod executor;
pub mod metrics;
pub mod router;
pub mod state;
pub mod stores;
pub mod telemetry;

pub use coordinator::SagaCoordinator;
pub use executor::{DurableExecutor, InlineExecutor, RetryingExecutor};
pub use metrics::{SagaMetrics, SagaMetricsSnapshot};
pub use router::{ReadRouter, ReadSource, ServedDocument};
pub use state::{transition, SagaEvent, SagaReport, SagaRun, SagaState};
pub use stores::DocumentStores;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

use docvault_core::DocVaultConfig;
use docvault_storage::{CacheBackend, DocumentCache};
use std::sync::Arc;

/// A coordinator and a router wired to the same stores, cache and metrics.
#[derive(Clone)]
pub struct DocVault {
    coordinator: SagaCoordinator,
    router: ReadRouter,
    metrics: Arc<SagaMetrics>,
}

impl DocVault {
    pub fn new(
        stores: DocumentStores,
        cache_backend: Arc<dyn CacheBackend>,
        config: &DocVaultConfig,
    ) -> Self {
        let cache = DocumentCache::new(cache_backend, config.cache_ttl);
        let metrics = Arc::new(SagaMetrics::new());
        Self {
            coordinator: SagaCoordinator::new(
                stores.clone(),
                cache.clone(),
                metrics.clone(),
                config,
            ),
            router: ReadRouter::new(stores, cache, metrics.clone(), config),
            metrics,
        }
    }

    pub fn coordinator(&self) -> &SagaCoordinator {
        &self.coordinator
    }

    pub fn router(&self) -> &ReadRouter {
        &self.router
    }

    pub fn metrics(&self) -> &Arc<SagaMetrics> {
        &self.metrics
    }
}
