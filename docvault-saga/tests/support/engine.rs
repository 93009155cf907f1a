//! Shared wiring for integration tests.

#![allow(dead_code)]

use docvault_core::{CacheWriteMode, DocVaultConfig, DocumentId};
use docvault_saga::{DocVault, DocumentStores};
use docvault_storage::{meta_key, payload_key, CacheBackend};
use docvault_test_utils::fixtures::TestStores;

/// An engine over fresh in-memory stores, plus the concrete stores.
pub fn test_engine() -> (DocVault, TestStores) {
    test_engine_with(DocVaultConfig::for_tests())
}

pub fn test_engine_with(config: DocVaultConfig) -> (DocVault, TestStores) {
    let stores = TestStores::new();
    let engine = engine_over(&stores, &config);
    (engine, stores)
}

/// A second engine sharing `stores`, e.g. with a different config.
pub fn engine_over(stores: &TestStores, config: &DocVaultConfig) -> DocVault {
    let document_stores = DocumentStores::new(
        stores.metadata.clone(),
        stores.content.clone(),
        stores.blobs.clone(),
    );
    DocVault::new(document_stores, stores.cache.clone(), config)
}

pub fn repopulating_config() -> DocVaultConfig {
    DocVaultConfig::for_tests().with_repopulate_on_miss(true)
}

pub fn background_config() -> DocVaultConfig {
    DocVaultConfig::for_tests().with_cache_write_mode(CacheWriteMode::Background)
}

/// Whether either cache key for `id` is live.
pub fn is_cached(stores: &TestStores, id: DocumentId) -> bool {
    stores.cache.contains_key(&payload_key(id)) || stores.cache.contains_key(&meta_key(id))
}

/// Drop both cache keys for `id`, as a TTL expiry would.
pub async fn expire_cache(stores: &TestStores, id: DocumentId) {
    let _ = stores.cache.delete(&payload_key(id)).await;
    let _ = stores.cache.delete(&meta_key(id)).await;
}
