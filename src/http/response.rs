//! Response construction.
//!
//! # Responsibilities
//! - Build responses with `Content-Type` and the cache-control pair set
//!   on every outcome, success and error alike
//! - Render status pages through the same template mechanism as success
//!   pages
//!
//! # Design Decisions
//! - The status catalog and default pages ship with the binary and are
//!   parsed once
//! - Headers a template sets via `set_header` are applied before the
//!   cache pair, so the cache policy is never overridden per page

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde_json::json;

use crate::config::{CacheConfig, ServerConfig};
use crate::render;

const STATUS_TABLE: &str = include_str!("../../etc/status.json");
const STATUS_PAGE: &str = include_str!("../../etc/default_page/status.tera");
const WELCOME_PAGE: &str = include_str!("../../etc/default_page/index.tera");
const LISTING_PAGE: &str = include_str!("../../etc/default_page/indexof.tera");

/// Informational header advertising the active cache policy.
pub const CACHE_POLICY_HEADER: &str = "x-cache-policy";

/// Immutable status-code → reason-string catalog.
#[derive(Debug)]
pub struct StatusCatalog {
    reasons: HashMap<u16, String>,
}

impl StatusCatalog {
    pub fn from_embedded() -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, String> = serde_json::from_str(STATUS_TABLE)?;
        let reasons = raw
            .into_iter()
            .filter_map(|(code, reason)| code.parse::<u16>().ok().map(|c| (c, reason)))
            .collect();
        Ok(Self { reasons })
    }

    pub fn reason(&self, code: u16) -> &str {
        self.reasons.get(&code).map(String::as_str).unwrap_or("Unknown")
    }

    /// `"404 Not Found"`-style line used by the status page template.
    pub fn status_line(&self, code: u16) -> String {
        format!("{} {}", code, self.reason(code))
    }
}

/// Built-in pages used when the document root has nothing better.
#[derive(Debug)]
pub struct BuiltinPages;

impl BuiltinPages {
    pub fn status(&self) -> &'static str {
        STATUS_PAGE
    }

    pub fn welcome(&self) -> &'static str {
        WELCOME_PAGE
    }

    pub fn listing(&self) -> &'static str {
        LISTING_PAGE
    }
}

/// Assemble a response: body, content type, template-set headers, then the
/// uniform cache pair.
pub fn finish(
    cache: &CacheConfig,
    status: StatusCode,
    content_type: &str,
    page_headers: &[(String, String)],
    body: Vec<u8>,
) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    for (name, value) in page_headers {
        let parsed = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        );
        if let (Ok(name), Ok(value)) = parsed {
            headers.insert(name, value);
        }
    }
    apply_cache_policy(headers, cache);

    response
}

/// Set the cache-control pair. Applied uniformly to every response.
pub fn apply_cache_policy(headers: &mut HeaderMap, cache: &CacheConfig) {
    if cache.status.is_on() {
        let max_age = format!("max-age={}", cache.max_age);
        if let Ok(value) = HeaderValue::from_str(&max_age) {
            headers.insert(header::CACHE_CONTROL, value.clone());
            headers.insert(HeaderName::from_static(CACHE_POLICY_HEADER), value);
        }
    } else {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    }
}

/// Render the built-in status page for an error or auth challenge.
///
/// The render itself cannot be allowed to fail the request again, so a
/// plain-text fallback stands in if the built-in template errors out.
pub fn status_page(
    config: &ServerConfig,
    catalog: &StatusCatalog,
    code: u16,
    extra_headers: &[(String, String)],
) -> Response<Body> {
    let status_line = catalog.status_line(code);
    let context = json!({
        "config": config,
        "STATUS": status_line,
    });

    let (content_type, body) = match render::render_one_off(STATUS_PAGE, &context) {
        Ok(rendered) => ("text/html".to_string(), rendered.body),
        Err(err) => {
            tracing::error!(code, error = %err, "status page render failed");
            ("text/plain".to_string(), status_line.clone().into_bytes())
        }
    };

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    finish(&config.cache, status, &content_type, extra_headers, body)
}
