//! Offline cache worker
//!
//! This module provides the lifecycle-bound cache population, request interception,
//! and stale version cleanup that keep a site usable while offline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────────┐     ┌─────────────┐
//! │   Network   │◀────│ OfflineCacheManager │────▶│CacheStorage │
//! │  (fetch)    │     │ install/fetch/activ.│     │  (storage)  │
//! └─────────────┘     └─────────────────────┘     └─────────────┘
//!        │                       ▲                       │
//!        ▼                       │                       ▼
//! ┌─────────────┐         ┌─────────────┐         ┌─────────────┐
//! │  Networks   │         │  Lifecycle  │         │ SQLite cache│
//! │  (origin)   │         │ (host-driven│         │   stores    │
//! └─────────────┘         └─────────────┘         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: SQLite-based cache stores partitioned by version name
//! - [`error`]: Error types for cache, network and worker operations
//! - [`lifecycle`]: Worker state machine driven by the host
//! - [`manager`]: The install, fetch and activate phase handlers
//! - [`network`]: Network trait for forwarding requests
//! - [`networks`]: Concrete network implementations
//! - [`storage`]: Cache storage trait
//! - [`types`]: Request, response, version and manifest types

pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod network;
pub mod networks;
pub mod storage;
pub mod types;
