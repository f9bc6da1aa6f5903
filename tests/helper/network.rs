//! Network test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use offline_cache::worker::error::NetworkError;
use offline_cache::worker::network::Network;
use offline_cache::worker::types::{Request, Response};

/// Stub origin that serves fixed pages and can be switched offline
pub struct StubNetwork {
    pages: HashMap<String, Response>,
    online: AtomicBool,
    requests: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            online: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Response::new(200, body).with_header("content-type", "text/html; charset=utf-8"),
        );
        self
    }

    pub fn with_response(mut self, url: &str, response: Response) -> Self {
        self.pages.insert(url.to_string(), response);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(request.url.clone()));
        }

        Ok(self
            .pages
            .get(request.cache_url())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}

/// The site's routes as served by the origin
pub fn site_network() -> StubNetwork {
    StubNetwork::new()
        .with_page("/", "<h1>Daily Verse</h1>")
        .with_page("/verses/KJV", "<h2>Genesis</h2><p>In the beginning God created</p>")
        .with_page("/verses/WEB", "<h2>Genesis</h2><p>In the beginning, God created</p>")
        .with_response(
            "/static/css/style.css",
            Response::new(200, "body { font-family: serif; }")
                .with_header("content-type", "text/css"),
        )
        .with_response(
            "/static/js/app.js",
            Response::new(200, "navigator.serviceWorker.register('/sw.js');")
                .with_header("content-type", "application/javascript"),
        )
        .with_page("/offline", "<h1>You are offline</h1>")
        .with_page("/about", "<h1>About</h1>")
}
