//! Document cache with pluggable key/value backends.
//!
//! The cache is a subordinate, disposable copy of what a read would serve.
//! Entries may be stale or absent and callers must tolerate both; absence
//! is never an error, only a fallback trigger.
//!
//! # Backends
//!
//! - [`InMemoryCacheBackend`]: process-local, lazily expiring, with a
//!   failure switch for tests
//! - [`LmdbCacheBackend`]: persistent, memory-mapped via heed
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(InMemoryCacheBackend::new());
//! let cache = DocumentCache::new(backend, Duration::from_secs(900));
//!
//! cache.set(id, "text/plain", &Payload::Blob(bytes)).await;
//! if let Some(hit) = cache.get(id).await {
//!     serve(hit.bytes, hit.mime);
//! }
//! ```

pub mod keys;
pub mod layer;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use keys::{meta_key, payload_key};
pub use layer::{encode_payload, CachedDocument, DocumentCache};
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory::InMemoryCacheBackend;
pub use traits::{CacheBackend, CacheHash, CacheResult, CacheStats, CacheValue};
