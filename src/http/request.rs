//! Request context extraction and body parsing.
//!
//! # Responsibilities
//! - Pull routing-relevant information out of an incoming request (host,
//!   path, query, cookies, client address, user agent)
//! - Buffer and parse POST bodies on demand (form-encoded or JSON)
//!
//! # Design Decisions
//! - GET/POST/COOKIE values live in an ordered map with explicit
//!   last-duplicate-wins insertion, not an incidental hash overwrite
//! - The body is consumed lazily: only a template render of a POST
//!   request ever buffers it
//! - Methods other than GET/POST are routed exactly like GET

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, Method, Request};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::routing::pipeline::ServeError;

/// Largest request body the server will buffer.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Ordered string → JSON-value map with last-duplicate-wins semantics.
#[derive(Debug, Default, Clone)]
pub struct ParamMap {
    entries: Vec<(String, Value)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; a duplicate key replaces the earlier entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn insert_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, Value::String(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into a JSON object for the template context.
    pub fn to_object(&self) -> Map<String, Value> {
        self.entries.iter().cloned().collect()
    }

    /// Apply a transform to every string value.
    pub fn map_strings(&mut self, f: impl Fn(&str) -> String) {
        for (_, value) in &mut self.entries {
            if let Value::String(s) = value {
                *value = Value::String(f(s));
            }
        }
    }
}

/// Everything the pipeline needs to know about one request.
///
/// Created when a connection delivers a request, dropped once the response
/// is written.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    /// URL path exactly as received (still percent-encoded).
    pub path: String,
    pub query: ParamMap,
    pub cookies: ParamMap,
    /// Host header value with any `:port` suffix removed.
    pub host: Option<String>,
    pub client_addr: String,
    pub user_agent: String,
    content_type: Option<String>,
    body: Option<Body>,
}

impl RequestContext {
    pub fn from_request(request: Request<Body>, peer: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();

        let host = header_str(&parts.headers, header::HOST)
            .map(|h| h.split(':').next().unwrap_or(h).to_string());

        // Behind a proxy the first X-Forwarded-For hop is the client.
        let client_addr =
            header_str(&parts.headers, header::HeaderName::from_static("x-forwarded-for"))
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| peer.ip().to_string());

        let user_agent = header_str(&parts.headers, header::USER_AGENT)
            .unwrap_or("-")
            .to_string();

        let content_type = header_str(&parts.headers, header::CONTENT_TYPE)
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

        let query = parse_query(parts.uri.query());
        let cookies = parse_cookies(header_str(&parts.headers, header::COOKIE));

        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query,
            cookies,
            host,
            client_addr,
            user_agent,
            content_type,
            body: Some(body),
        }
    }

    /// Percent-decoded request path, for display and logging.
    pub fn decoded_path(&self) -> String {
        percent_decode_str(&self.path)
            .decode_utf8_lossy()
            .into_owned()
    }

    pub fn is_site_root(&self) -> bool {
        self.path == "/"
    }

    /// Buffer and parse the POST body. Non-POST methods contribute an
    /// empty map. The body is consumed at most once.
    pub async fn post_params(&mut self) -> Result<ParamMap, ServeError> {
        if self.method != Method::POST {
            return Ok(ParamMap::new());
        }
        let Some(body) = self.body.take() else {
            return Ok(ParamMap::new());
        };
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|err| ServeError::BadRequest(format!("body read failed: {err}")))?;

        match self.content_type.as_deref() {
            Some("application/json") => parse_json_body(&bytes),
            _ => Ok(parse_form_body(&bytes)),
        }
    }
}

fn header_str<'a>(headers: &'a header::HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parse a query string: split on `&` then `=`, percent-decode both halves.
fn parse_query(query: Option<&str>) -> ParamMap {
    let mut params = ParamMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert_str(
            percent_decode_str(key.trim()).decode_utf8_lossy().into_owned(),
            percent_decode_str(value.trim()).decode_utf8_lossy().into_owned(),
        );
    }
    params
}

/// Parse a Cookie header: `name=value` pairs separated by `;`.
fn parse_cookies(header: Option<&str>) -> ParamMap {
    let mut cookies = ParamMap::new();
    let Some(header) = header else {
        return cookies;
    };
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        cookies.insert_str(
            name.trim().to_string(),
            percent_decode_str(value.trim()).decode_utf8_lossy().into_owned(),
        );
    }
    cookies
}

/// Form-encoded body: split on `&` then `=`; in the value half a literal
/// `+` means space, then percent-decoding applies.
fn parse_form_body(bytes: &[u8]) -> ParamMap {
    let mut params = ParamMap::new();
    let text = String::from_utf8_lossy(bytes);
    for pair in text.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = value.replace('+', " ");
        params.insert_str(
            percent_decode_str(key.trim()).decode_utf8_lossy().trim().to_string(),
            percent_decode_str(&value).decode_utf8_lossy().trim().to_string(),
        );
    }
    params
}

/// JSON body: a flat object merged key by key.
fn parse_json_body(bytes: &[u8]) -> Result<ParamMap, ServeError> {
    let object: Map<String, Value> = serde_json::from_slice(bytes)
        .map_err(|err| ServeError::BadRequest(format!("malformed JSON body: {err}")))?;
    let mut params = ParamMap::new();
    for (key, value) in object {
        params.insert(key, value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for(uri: &str, headers: &[(&str, &str)]) -> RequestContext {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();
        RequestContext::from_request(request, "127.0.0.1:4000".parse().unwrap())
    }

    #[test]
    fn query_params_last_value_wins() {
        let ctx = context_for("http://h/p?a=1&b=2&a=3", &[]);
        assert_eq!(ctx.query.get_str("a"), Some("3"));
        assert_eq!(ctx.query.get_str("b"), Some("2"));
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let ctx = context_for("http://h/p?msg=hello%20world", &[]);
        assert_eq!(ctx.query.get_str("msg"), Some("hello world"));
    }

    #[test]
    fn host_is_stripped_of_port() {
        let ctx = context_for("http://x/", &[("Host", "example.org:8080")]);
        assert_eq!(ctx.host.as_deref(), Some("example.org"));
    }

    #[test]
    fn forwarded_for_beats_peer_address() {
        let ctx = context_for("http://x/", &[("X-Forwarded-For", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(ctx.client_addr, "203.0.113.9");
        let plain = context_for("http://x/", &[]);
        assert_eq!(plain.client_addr, "127.0.0.1");
    }

    #[test]
    fn cookies_trim_and_keep_last_duplicate() {
        let ctx = context_for(
            "http://x/",
            &[("Cookie", "session=abc; theme=dark ; session=def")],
        );
        assert_eq!(ctx.cookies.get_str("session"), Some("def"));
        assert_eq!(ctx.cookies.get_str("theme"), Some("dark"));
    }

    #[tokio::test]
    async fn form_body_parses_plus_as_space() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://x/submit")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from("a=1&b=two+words"))
            .unwrap();
        let mut ctx = RequestContext::from_request(request, "127.0.0.1:4000".parse().unwrap());
        let post = ctx.post_params().await.unwrap();
        assert_eq!(post.get_str("a"), Some("1"));
        assert_eq!(post.get_str("b"), Some("two words"));
    }

    #[tokio::test]
    async fn json_body_merges_flat_object() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://x/submit")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"name":"ada","count":2}"#))
            .unwrap();
        let mut ctx = RequestContext::from_request(request, "127.0.0.1:4000".parse().unwrap());
        let post = ctx.post_params().await.unwrap();
        assert_eq!(post.get_str("name"), Some("ada"));
        assert_eq!(post.get("count"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn malformed_json_body_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://x/submit")
            .header("Content-Type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let mut ctx = RequestContext::from_request(request, "127.0.0.1:4000".parse().unwrap());
        assert!(ctx.post_params().await.is_err());
    }

    #[tokio::test]
    async fn get_requests_have_empty_post_map() {
        let mut ctx = context_for("http://x/?a=1", &[]);
        assert!(ctx.post_params().await.unwrap().is_empty());
    }

    #[test]
    fn param_map_replaces_in_place() {
        let mut map = ParamMap::new();
        map.insert_str("k", "v1");
        map.insert_str("k", "v2");
        assert_eq!(map.to_object().len(), 1);
        assert_eq!(map.get_str("k"), Some("v2"));
    }
}
