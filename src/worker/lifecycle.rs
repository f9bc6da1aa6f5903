//! Worker state machine driven by the host
//!
//! `Installing → Installed → Activating → Active`, with `Redundant` reached
//! when install fails. The host decides when each phase runs; this module
//! only enforces the ordering and records the outcome.

use std::fmt;

use tracing::{info, warn};

use crate::worker::error::WorkerError;
use crate::worker::manager::OfflineCacheManager;
use crate::worker::storage::CacheStorage;
use crate::worker::types::CacheVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    /// Installed and waiting to take control
    Installed,
    Activating,
    Active,
    /// Install failed
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }

    fn can_advance_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Active)
                | (Installing, Redundant)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks a single worker instance through its lifecycle
#[derive(Debug)]
pub struct Lifecycle {
    version: CacheVersion,
    state: WorkerState,
}

impl Lifecycle {
    pub fn new(version: CacheVersion) -> Self {
        Self {
            version,
            state: WorkerState::Installing,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow
    pub fn advance(&mut self, next: WorkerState) -> Result<(), WorkerError> {
        if !self.state.can_advance_to(next) {
            return Err(WorkerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        info!("Worker {}: {} -> {}", self.version, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Runs the install phase. Failure makes the worker redundant.
    pub async fn install<S: CacheStorage>(
        &mut self,
        manager: &OfflineCacheManager<S>,
    ) -> Result<(), WorkerError> {
        if self.state != WorkerState::Installing {
            return Err(WorkerError::InvalidTransition {
                from: self.state,
                to: WorkerState::Installed,
            });
        }

        match manager.on_install().await {
            Ok(()) => self.advance(WorkerState::Installed),
            Err(e) => {
                self.advance(WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    /// Skips the install phase when the current version is already installed,
    /// otherwise runs it. A store persisted by an earlier run is enough to start
    /// serving without the origin.
    pub async fn install_if_needed<S: CacheStorage>(
        &mut self,
        manager: &OfflineCacheManager<S>,
    ) -> Result<(), WorkerError> {
        if self.state == WorkerState::Installing && manager.is_installed()? {
            info!("Cache {} already installed, skipping precache", self.version);
            return self.advance(WorkerState::Installed);
        }

        self.install(manager).await
    }

    /// Runs the activate phase. The worker becomes active even if cleanup fails;
    /// the cleanup error is still returned so the host can report it.
    pub async fn activate<S: CacheStorage>(
        &mut self,
        manager: &OfflineCacheManager<S>,
    ) -> Result<Vec<String>, WorkerError> {
        self.advance(WorkerState::Activating)?;

        let result = manager.on_activate().await;
        if let Err(e) = &result {
            warn!("Activation cleanup for {} incomplete: {}", self.version, e);
        }

        self.advance(WorkerState::Active)?;
        result
    }
}
