//! Cache backend trait and statistics.

use async_trait::async_trait;
use docvault_core::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Result type for cache backend calls.
pub type CacheResult<T> = Result<T, CacheError>;

/// Field map stored under a hash key.
pub type CacheHash = BTreeMap<String, String>;

/// A value as held by a backend. A key holds exactly one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheValue {
    Bytes(Vec<u8>),
    Hash(CacheHash),
}

impl CacheValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheValue::Bytes(_) => "bytes",
            CacheValue::Hash(_) => "hash",
        }
    }

    pub(crate) fn into_bytes(self, key: &str) -> CacheResult<Vec<u8>> {
        match self {
            CacheValue::Bytes(bytes) => Ok(bytes),
            other => Err(wrong_kind(key, "bytes", other.kind())),
        }
    }

    pub(crate) fn into_hash(self, key: &str) -> CacheResult<CacheHash> {
        match self {
            CacheValue::Hash(hash) => Ok(hash),
            other => Err(wrong_kind(key, "hash", other.kind())),
        }
    }
}

fn wrong_kind(key: &str, expected: &str, found: &str) -> CacheError {
    CacheError::Deserialization(format!(
        "key '{}' holds {} but {} was requested",
        key, found, expected
    ))
}

/// Key/value cache backend.
///
/// Every write carries an explicit TTL; an expired key reads as absent.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set_hash(&self, key: &str, fields: &CacheHash, ttl: Duration) -> CacheResult<()>;

    async fn get_hash(&self, key: &str) -> CacheResult<Option<CacheHash>>;

    /// Remove a key. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live key.
    pub hits: u64,
    /// Number of reads that found nothing (or an expired key).
    pub misses: u64,
    /// Number of keys currently stored, expired ones included until evicted.
    pub entry_count: u64,
    /// Number of keys dropped because their TTL ran out.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_wrong_kind_is_deserialization_error() {
        let err = CacheValue::Bytes(vec![1]).into_hash("meta:x").unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
        assert!(err.to_string().contains("meta:x"));
    }
}
