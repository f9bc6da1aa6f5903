//! Tracing subscriber setup

use std::path::Path;

use anyhow::{Context, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. "offline_cache=debug")
pub const LOG_FILTER_ENV: &str = "OFFLINE_CACHE_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a global subscriber that appends to `log_path`.
///
/// The returned guard flushes buffered lines on drop and must be held until exit.
pub fn init_logging(log_path: &Path, json: bool) -> anyhow::Result<WorkerGuard> {
    let dir = log_path
        .parent()
        .ok_or_else(|| anyhow!("Log path {:?} has no parent directory", log_path))?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("Log path {:?} has no file name", log_path))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
