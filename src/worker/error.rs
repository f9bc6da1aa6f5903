use thiserror::Error;

use crate::worker::lifecycle::WorkerState;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid stored headers: {0}")]
    Headers(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Origin unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to precache {url}: {reason}")]
    PrecacheFailure { url: String, reason: String },

    #[error("No cached response or offline fallback for {url}")]
    OfflineFallbackMissing { url: String },

    #[error("Cache {version} is not installed")]
    NotInstalled { version: String },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },
}
