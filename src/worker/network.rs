//! Network trait for forwarding intercepted requests

#[cfg(test)]
use mockall::automock;

use crate::worker::error::NetworkError;
use crate::worker::types::{Request, Response};

/// Trait for sending a request over the network
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Sends the request and collects the full response
    ///
    /// # Returns
    /// * `Ok(Response)` - Any response the server produced, including non-2xx statuses
    /// * `Err(NetworkError)` - If no response could be obtained (e.g. offline)
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}
