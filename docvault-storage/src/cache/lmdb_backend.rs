//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped key-value cache that survives process restarts.
//!
//! # Value Layout
//!
//! Every value is stored as `[expires_at_ms: 8 bytes LE][json CacheValue]`.
//! Expired values are removed lazily by the read that finds them.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get_*` operations
//! - Write transactions for `set_*`, `delete` and lazy eviction
//! - Statistics are tracked with atomic counters

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::CacheError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheBackend, CacheHash, CacheResult, CacheStats, CacheValue};

const EXPIRY_PREFIX_LEN: usize = 8;

/// Error type for opening an LMDB cache.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

fn txn_error(e: heed::Error) -> CacheError {
    CacheError::Backend(format!("LMDB transaction error: {}", e))
}

/// LMDB-backed cache backend.
///
/// # Example
///
/// ```ignore
/// use docvault_storage::cache::{CacheBackend, LmdbCacheBackend};
/// use std::time::Duration;
///
/// let backend = LmdbCacheBackend::new("/var/cache/docvault", 100)?;
/// backend.set_bytes("payload:42", b"hello", Duration::from_secs(900)).await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn encode(value: &CacheValue, ttl: Duration) -> CacheResult<Vec<u8>> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_ms);
        let json =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut full_bytes = Vec::with_capacity(EXPIRY_PREFIX_LEN + json.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(&json);
        Ok(full_bytes)
    }

    /// Split a stored value into expiry and payload.
    fn decode(bytes: &[u8]) -> CacheResult<(i64, CacheValue)> {
        if bytes.len() < EXPIRY_PREFIX_LEN {
            return Err(CacheError::Deserialization("value shorter than header".into()));
        }
        let expiry_bytes: [u8; EXPIRY_PREFIX_LEN] = bytes[..EXPIRY_PREFIX_LEN]
            .try_into()
            .map_err(|_| CacheError::Deserialization("Invalid expiry".into()))?;
        let value = serde_json::from_slice(&bytes[EXPIRY_PREFIX_LEN..])
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok((i64::from_le_bytes(expiry_bytes), value))
    }

    fn put(&self, key: &str, value: &CacheValue, ttl: Duration) -> CacheResult<()> {
        let full_bytes = Self::encode(value, ttl)?;

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &full_bytes)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)
    }

    fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let stored = {
            let rtxn = self.env.read_txn().map_err(txn_error)?;
            self.db
                .get(&rtxn, key.as_bytes())
                .map_err(txn_error)?
                .map(|bytes| bytes.to_vec())
        };

        let Some(bytes) = stored else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let (expires_at, value) = Self::decode(&bytes)?;
        if expires_at <= Utc::now().timestamp_millis() {
            self.remove(key)?;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(value))
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.put(key, &CacheValue::Bytes(value.to_vec()), ttl)
    }

    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.fetch(key)?.map(|v| v.into_bytes(key)).transpose()
    }

    async fn set_hash(&self, key: &str, fields: &CacheHash, ttl: Duration) -> CacheResult<()> {
        self.put(key, &CacheValue::Hash(fields.clone()), ttl)
    }

    async fn get_hash(&self, key: &str) -> CacheResult<Option<CacheHash>> {
        self.fetch(key)?.map(|v| v.into_hash(key)).transpose()
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.remove(key)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_error)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
