use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Cache-related constants
// =============================================================================

/// Cache generation name. Bump whenever `DEFAULT_PRECACHE_URLS` changes.
pub const DEFAULT_CACHE_NAME: &str = "bible-app-cache-v3";

/// Routes fetched and stored eagerly during install
pub const DEFAULT_PRECACHE_URLS: &[&str] = &[
    "/",
    "/verses/KJV",
    "/verses/WEB",
    "/static/css/style.css",
    "/static/js/app.js",
    "/offline",
];

/// Route served when neither the network nor an exact cache match succeeds
pub const OFFLINE_FALLBACK_PATH: &str = "/offline";

// =============================================================================
// Host-related constants
// =============================================================================

/// Origin site the worker sits in front of (Flask development server)
pub const DEFAULT_ORIGIN_URL: &str = "http://127.0.0.1:5000";

/// Address the host adapter listens on
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Upper bound on a buffered request body forwarded to the origin (10 MiB)
pub const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Worker configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerConfig {
    pub cache: CacheConfig,
    pub origin: OriginConfig,
    pub server: ServerConfig,
}

/// Cache generation and precache manifest
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache version identifier
    pub name: String,
    /// URLs fetched and stored during install
    pub precache: Vec<String>,
    /// Path served when a request fails and has no cached copy
    pub offline_fallback: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            precache: DEFAULT_PRECACHE_URLS
                .iter()
                .map(|url| url.to_string())
                .collect(),
            offline_fallback: OFFLINE_FALLBACK_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OriginConfig {
    pub url: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ORIGIN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Loads configuration.
    ///
    /// An explicit path must exist. Without one, `config_path()` is read if present,
    /// otherwise the built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the path to the data directory for offline-cache.
/// Uses $XDG_DATA_HOME/offline-cache if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/offline-cache,
/// or ./offline-cache if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the cache database file.
pub fn db_path() -> PathBuf {
    data_dir().join("caches.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("offline-cache.log")
}

/// Returns the path to the optional config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("offline-cache")
}
