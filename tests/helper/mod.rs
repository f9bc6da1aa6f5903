#![allow(dead_code)]

pub mod network;

use std::sync::Arc;

use tempfile::TempDir;

use offline_cache::config::DEFAULT_PRECACHE_URLS;
use offline_cache::worker::cache::SqliteCacheStorage;
use offline_cache::worker::manager::OfflineCacheManager;
use offline_cache::worker::types::{CacheVersion, PrecacheManifest};

pub use network::{StubNetwork, site_network};

/// Create an empty SQLite cache storage in a temporary directory
pub fn create_test_storage() -> (TempDir, Arc<SqliteCacheStorage>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = SqliteCacheStorage::new(&db_path).unwrap();
    (temp_dir, Arc::new(storage))
}

/// Create a manager for `version` using the default precache manifest
pub fn create_test_manager(
    storage: Arc<SqliteCacheStorage>,
    network: Arc<StubNetwork>,
    version: &str,
) -> OfflineCacheManager<SqliteCacheStorage> {
    OfflineCacheManager::new(
        storage,
        network,
        CacheVersion::new(version),
        PrecacheManifest::new(DEFAULT_PRECACHE_URLS.iter().copied()),
    )
}
