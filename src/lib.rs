//! Offline cache worker
//!
//! Precaches a fixed set of site routes, serves requests network-first with a
//! cache and offline-page fallback, and prunes stale cache generations.
//!
//! # Modules
//!
//! - [`config`]: Defaults, config file loading and data paths
//! - [`host`]: HTTP host adapter and CLI commands that drive the worker
//! - [`logging`]: Tracing subscriber setup
//! - [`worker`]: The cache manager, its collaborators and lifecycle

pub mod config;
pub mod host;
pub mod logging;
pub mod worker;
