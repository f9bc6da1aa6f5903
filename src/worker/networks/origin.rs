//! Network implementation that forwards requests to the origin site

use reqwest::header::HOST;
use tracing::{debug, warn};

use crate::worker::error::NetworkError;
use crate::worker::network::Network;
use crate::worker::types::{Request, Response};

/// Network implementation backed by an HTTP client pointed at a single origin
pub struct OriginNetwork {
    client: reqwest::Client,
    base_url: String,
}

impl OriginNetwork {
    /// Creates a new OriginNetwork for the given base URL (e.g. "http://127.0.0.1:5000")
    pub fn new(base_url: &str) -> Result<Self, NetworkError> {
        // Redirects are handed back to the caller untouched
        let client = reqwest::Client::builder()
            .user_agent("offline-cache")
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn target_url(&self, request: &Request) -> String {
        if request.url.starts_with('/') {
            format!("{}{}", self.base_url, request.cache_url())
        } else {
            format!("{}/{}", self.base_url, request.cache_url())
        }
    }
}

#[async_trait::async_trait]
impl Network for OriginNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let url = self.target_url(request);
        debug!("Forwarding {} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case(HOST.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                NetworkError::Unreachable(url.clone())
            } else if e.is_builder() {
                NetworkError::InvalidRequest(e.to_string())
            } else {
                NetworkError::Request(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                Err(_) => {
                    warn!("Dropping non-UTF-8 header {} from {}", name, url);
                    None
                }
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
