//! In-memory cache backend.
//!
//! Entries carry an expiry instant on the tokio clock and are evicted lazily
//! when read. The backend can be switched into a failing state to exercise
//! the paths where the cache is unavailable.

use super::traits::{CacheBackend, CacheHash, CacheResult, CacheStats, CacheValue};
use async_trait::async_trait;
use docvault_core::CacheError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    expires_at: Instant,
}

/// `HashMap`-backed cache with per-entry TTL.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: Mutex<HashMap<String, Entry>>,
    failing: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a backend error (or stop doing so).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Whether `key` is present and live, without touching statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.get(key).is_some_and(|e| e.expires_at > now))
            .unwrap_or(false)
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("cache unavailable".to_string()));
        }
        Ok(())
    }

    fn put(&self, key: &str, value: CacheValue, ttl: Duration) -> CacheResult<()> {
        self.check_available()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("lock poisoned".to_string()))?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        self.check_available()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("lock poisoned".to_string()))?;

        let now = Instant::now();
        let expired = entries.get(key).is_some_and(|entry| entry.expires_at <= now);
        if expired {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        let live = entries.get(key).map(|entry| entry.value.clone());

        match live {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(live)
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.put(key, CacheValue::Bytes(value.to_vec()), ttl)
    }

    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fetch(key)?.map(|v| v.into_bytes(key)).transpose()
    }

    async fn set_hash(&self, key: &str, fields: &CacheHash, ttl: Duration) -> CacheResult<()> {
        self.put(key, CacheValue::Hash(fields.clone()), ttl)
    }

    async fn get_hash(&self, key: &str) -> CacheResult<Option<CacheHash>> {
        self.fetch(key)?.map(|v| v.into_hash(key)).transpose()
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.check_available()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("lock poisoned".to_string()))?;
        Ok(entries.remove(key).is_some())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let entry_count = self
            .entries
            .lock()
            .map(|entries| entries.len() as u64)
            .unwrap_or(0);
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
