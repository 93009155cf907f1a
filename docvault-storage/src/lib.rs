//! DocVault Storage - Store Contracts, Adapters and Cache
//!
//! Defines the three store contracts the saga coordinator and read router
//! depend on, in-memory and filesystem adapters for them, call observation,
//! and the document cache.

pub mod cache;
pub mod fault;
pub mod fs_blob;
pub mod memory;
pub mod observe;
pub mod traits;

pub use cache::{
    meta_key, payload_key, CacheBackend, CacheStats, CachedDocument, DocumentCache,
    InMemoryCacheBackend, LmdbCacheBackend, LmdbCacheError,
};
pub use fault::{CallCounter, FaultInjector, FaultMode};
pub use fs_blob::{FsBlobStore, DEFAULT_BUCKET};
pub use memory::{InMemoryBlobStore, InMemoryContentStore, InMemoryMetadataStore};
pub use observe::{CallStatus, Observed, OpStats, StoreMetrics};
pub use traits::{BlobStore, ContentStore, MetadataStore};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
