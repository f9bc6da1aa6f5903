//! Install, fetch and activate phase handlers

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::config::OFFLINE_FALLBACK_PATH;
use crate::worker::error::WorkerError;
use crate::worker::network::Network;
use crate::worker::storage::CacheStorage;
use crate::worker::types::{CacheVersion, PrecacheManifest, Request, Response};

/// Mediates between the network and the versioned cache stores
pub struct OfflineCacheManager<S: CacheStorage> {
    storage: Arc<S>,
    network: Arc<dyn Network>,
    version: CacheVersion,
    manifest: PrecacheManifest,
    offline_fallback: String,
}

impl<S: CacheStorage> OfflineCacheManager<S> {
    pub fn new(
        storage: Arc<S>,
        network: Arc<dyn Network>,
        version: CacheVersion,
        manifest: PrecacheManifest,
    ) -> Self {
        Self {
            storage,
            network,
            version,
            manifest,
            offline_fallback: OFFLINE_FALLBACK_PATH.to_string(),
        }
    }

    /// Overrides the path served when a request fails and has no cached copy
    pub fn with_offline_fallback(mut self, path: impl Into<String>) -> Self {
        self.offline_fallback = path.into();
        self
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Whether a previous install of the current version completed
    pub fn is_installed(&self) -> Result<bool, WorkerError> {
        Ok(self.storage.is_installed(self.version.as_str())?)
    }

    /// Install phase: fetch every manifest URL and store them under the current version.
    ///
    /// Entries are written only after all fetches succeed, so a failed install
    /// leaves nothing behind from this attempt.
    pub async fn on_install(&self) -> Result<(), WorkerError> {
        let name = self.version.as_str();
        info!(
            "Installing cache {} with {} entries",
            name,
            self.manifest.len()
        );

        if !self.manifest.contains(&self.offline_fallback) {
            warn!(
                "Offline fallback {} is not in the precache manifest; offline requests may fail",
                self.offline_fallback
            );
        }

        let entries = try_join_all(self.manifest.iter().map(|url| self.precache(url)))
            .await
            .inspect_err(|e| error!("Install of cache {} failed: {}", name, e))?;

        self.storage.add_all(name, entries)?;

        info!("Installed cache {}", name);
        Ok(())
    }

    async fn precache(&self, url: &str) -> Result<(Request, Response), WorkerError> {
        let request = Request::get(url);
        let response = self.network.fetch(&request).await.map_err(|e| {
            WorkerError::PrecacheFailure {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.is_ok() {
            return Err(WorkerError::PrecacheFailure {
                url: url.to_string(),
                reason: format!("Unexpected status: {}", response.status),
            });
        }

        debug!("Fetched {} ({} bytes)", url, response.body.len());
        Ok((request, response))
    }

    /// Fetch phase: network first, then the exact cached copy, then the offline page.
    ///
    /// Successful network responses are returned as-is and never written to the cache.
    pub async fn on_fetch(&self, request: Request) -> Result<Response, WorkerError> {
        let network_error = match self.network.fetch(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        debug!(
            "Network failed for {} {}: {}",
            request.method, request.url, network_error
        );

        if let Some(cached) = self.storage.match_request(&request)? {
            debug!("Serving {} from cache", request.url);
            return Ok(cached);
        }

        let fallback = Request::get(self.offline_fallback.as_str());
        match self.storage.match_request(&fallback)? {
            Some(offline) => {
                debug!(
                    "Serving offline fallback {} for {}",
                    self.offline_fallback, request.url
                );
                Ok(offline)
            }
            None => {
                warn!(
                    "No cached response or offline fallback for {}",
                    request.url
                );
                Err(WorkerError::OfflineFallbackMissing { url: request.url })
            }
        }
    }

    /// Activate phase: delete every store not named by the current version.
    ///
    /// Refused while the current version is not installed, so a failed install
    /// never removes the last good generation. All deletions are attempted.
    /// Returns the names that were removed, or the first deletion error once
    /// every deletion has been tried.
    pub async fn on_activate(&self) -> Result<Vec<String>, WorkerError> {
        let current = self.version.as_str();
        if !self.storage.is_installed(current)? {
            warn!("Refusing to activate cache {}: not installed", current);
            return Err(WorkerError::NotInstalled {
                version: current.to_string(),
            });
        }

        let stale: Vec<String> = self
            .storage
            .keys()?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        info!(
            "Activating cache {}: {} stale caches",
            current,
            stale.len()
        );

        let mut deleted = Vec::new();
        let mut first_error = None;
        for name in stale {
            match self.storage.delete(&name) {
                Ok(true) => {
                    info!("Deleted stale cache {}", name);
                    deleted.push(name);
                }
                Ok(false) => debug!("Cache {} already gone", name),
                Err(e) => {
                    error!("Failed to delete cache {}: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(deleted),
        }
    }
}
