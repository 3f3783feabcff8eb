//! Shared utilities for pipeline integration tests.

use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::http::{Request, Response};

use tera_httpd::config::{ServerConfig, Toggle};
use tera_httpd::http::{AppState, RequestContext};

/// Build worker state over a document root, with caching and listings on.
pub fn state_for_root(root: &Path) -> AppState {
    let mut config = ServerConfig::default();
    config.document_root = root.to_path_buf();
    config.cache.status = Toggle::On;
    config.cache.max_age = 3600;
    config.indexof = Toggle::On;
    config.escapehtml = Toggle::Off;
    state_with(config, root)
}

/// Build worker state from a fully prepared config.
pub fn state_with(config: ServerConfig, root: &Path) -> AppState {
    AppState::build(config, root.join("define.json")).expect("state should build")
}

/// Create a request context the way the fallback handler would.
pub fn context(uri: &str) -> RequestContext {
    context_from(request(uri))
}

pub fn request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn context_from(request: Request<Body>) -> RequestContext {
    let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
    RequestContext::from_request(request, peer)
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
