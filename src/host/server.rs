//! HTTP host adapter

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request as HttpRequest, State};
use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::MAX_REQUEST_BODY_BYTES;
use crate::worker::error::WorkerError;
use crate::worker::lifecycle::{Lifecycle, WorkerState};
use crate::worker::manager::OfflineCacheManager;
use crate::worker::storage::CacheStorage;
use crate::worker::types::{Request, Response};

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "content-length",
];

/// Builds a router that sends every request through the fetch phase
pub fn router<S: CacheStorage>(manager: Arc<OfflineCacheManager<S>>) -> Router {
    Router::new()
        .fallback(handle_fetch::<S>)
        .with_state(manager)
}

/// Installs and activates the worker, then serves until Ctrl-C
pub async fn run_server<S: CacheStorage>(
    manager: Arc<OfflineCacheManager<S>>,
    listen: &str,
) -> anyhow::Result<()> {
    bring_up(&manager).await?;

    let listener = TcpListener::bind(listen).await?;
    serve(manager, listener, shutdown_signal()).await
}

/// Moves a fresh worker through install and activate before it takes requests.
///
/// An already installed version is not precached again. When install fails the
/// worker is redundant, and requests are still served from the caches of earlier
/// runs if there are any; only an empty storage aborts startup.
pub async fn bring_up<S: CacheStorage>(
    manager: &OfflineCacheManager<S>,
) -> Result<Lifecycle, WorkerError> {
    let mut lifecycle = Lifecycle::new(manager.version().clone());

    if let Err(e) = lifecycle.install_if_needed(manager).await {
        if lifecycle.state() != WorkerState::Redundant || manager.storage().keys()?.is_empty() {
            return Err(e);
        }
        warn!(
            "Install of {} failed, serving previous caches: {}",
            manager.version(),
            e
        );
        return Ok(lifecycle);
    }

    if let Err(e) = lifecycle.activate(manager).await {
        warn!("Continuing with incomplete cache cleanup: {}", e);
    }
    Ok(lifecycle)
}

/// Serves requests on `listener` until `shutdown` completes
pub async fn serve<S: CacheStorage>(
    manager: Arc<OfflineCacheManager<S>>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!(
        "Serving cache {} on {}",
        manager.version(),
        listener.local_addr()?
    );

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn handle_fetch<S: CacheStorage>(
    State(manager): State<Arc<OfflineCacheManager<S>>>,
    request: HttpRequest,
) -> HttpResponse {
    let request = match into_worker_request(request).await {
        Ok(request) => request,
        Err(message) => {
            warn!("Rejecting request: {}", message);
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    match manager.on_fetch(request).await {
        Ok(response) => into_http_response(response),
        Err(WorkerError::OfflineFallbackMissing { url }) => {
            warn!("Connection error for {}", url);
            StatusCode::BAD_GATEWAY.into_response()
        }
        Err(e) => {
            error!("Fetch handler failed: {}", e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn into_worker_request(request: HttpRequest) -> Result<Request, String> {
    let (parts, body) = request.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| match value.to_str() {
            Ok(value) => Some((name.as_str().to_string(), value.to_string())),
            Err(_) => {
                warn!("Dropping non-UTF-8 request header {}", name);
                None
            }
        })
        .collect();
    let body = to_bytes(body, MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| format!("Failed to read request body: {}", e))?;

    Ok(Request {
        method: parts.method,
        url: url.to_string(),
        headers,
        body: body.to_vec(),
    })
}

fn into_http_response(response: Response) -> HttpResponse {
    let mut builder = http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Body::from(response.body)).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}
