//! One-shot CLI operations

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::WorkerConfig;
use crate::worker::cache::SqliteCacheStorage;
use crate::worker::manager::OfflineCacheManager;
use crate::worker::networks::OriginNetwork;
use crate::worker::storage::CacheStorage;
use crate::worker::types::{CacheVersion, PrecacheManifest, Request};

/// Builds a manager backed by the SQLite store at `db_path` and the configured origin
pub fn build_manager(
    config: &WorkerConfig,
    db_path: &Path,
) -> anyhow::Result<OfflineCacheManager<SqliteCacheStorage>> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }

    let storage = SqliteCacheStorage::new(db_path)
        .with_context(|| format!("Failed to open cache database {:?}", db_path))?;
    let network = OriginNetwork::new(&config.origin.url)?;

    info!(
        "Worker for cache {} in front of {}",
        config.cache.name, config.origin.url
    );

    Ok(OfflineCacheManager::new(
        Arc::new(storage),
        Arc::new(network),
        CacheVersion::new(config.cache.name.as_str()),
        PrecacheManifest::new(config.cache.precache.iter().cloned()),
    )
    .with_offline_fallback(config.cache.offline_fallback.as_str()))
}

pub async fn install<S: CacheStorage>(
    manager: &OfflineCacheManager<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    manager.on_install().await?;

    let name = manager.version().as_str();
    let count = manager.storage().entries(name)?.len();
    writeln!(out, "Installed {} ({} entries)", name, count)?;
    Ok(())
}

pub async fn activate<S: CacheStorage>(
    manager: &OfflineCacheManager<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let deleted = manager.on_activate().await?;

    if deleted.is_empty() {
        writeln!(out, "No stale caches")?;
    }
    for name in deleted {
        writeln!(out, "Deleted {}", name)?;
    }
    Ok(())
}

/// Lists every store, marking the current version with `*`
pub fn list_caches<S: CacheStorage>(
    storage: &S,
    current: &CacheVersion,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let names = storage.keys()?;
    if names.is_empty() {
        writeln!(out, "No caches")?;
        return Ok(());
    }

    for name in names {
        let marker = if name == current.as_str() { "*" } else { " " };
        let entries = storage.entries(&name)?;
        writeln!(out, "{} {} ({} entries)", marker, name, entries.len())?;

        for entry in entries {
            let stored_at = chrono::DateTime::from_timestamp_millis(entry.stored_at)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| entry.stored_at.to_string());
            writeln!(
                out,
                "    {} {} {}B {}",
                entry.status, entry.url, entry.size, stored_at
            )?;
        }
    }
    Ok(())
}

/// Runs a single GET through the fetch phase and writes the status and body
pub async fn fetch<S: CacheStorage>(
    manager: &OfflineCacheManager<S>,
    url: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let response = manager.on_fetch(Request::get(url)).await?;

    writeln!(out, "{}", response.status)?;
    out.write_all(&response.body)?;
    if !response.body.ends_with(b"\n") {
        writeln!(out)?;
    }
    Ok(())
}
