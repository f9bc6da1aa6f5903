//! Host runtime layer
//!
//! Drives the worker's lifecycle phases and feeds it intercepted requests.
//!
//! # Modules
//!
//! - [`commands`]: One-shot CLI operations (install, activate, list, fetch)
//! - [`server`]: HTTP host adapter that routes every request through the fetch phase

pub mod commands;
pub mod server;
