//! Cache storage trait

#[cfg(test)]
use mockall::automock;

use crate::worker::error::CacheError;
use crate::worker::types::{CachedEntry, Request, Response};

/// Trait for named request/response stores
#[cfg_attr(test, automock)]
pub trait CacheStorage: Send + Sync + 'static {
    /// Store all entries in the named store as a single atomic write,
    /// creating the store if needed and marking it installed.
    /// Existing entries with the same request identity are replaced.
    fn add_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), CacheError>;

    /// Whether the named store exists and a precache write has completed in it
    fn is_installed(&self, name: &str) -> Result<bool, CacheError>;

    /// Look up a request across all stores, oldest store first.
    /// Only GET requests can match.
    fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError>;

    /// Names of all stores in creation order
    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete the named store and its entries. Returns false if it did not exist.
    fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// Summaries of the entries in the named store
    fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, CacheError>;
}
