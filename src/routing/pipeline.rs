//! Response pipeline.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → vhost.rs (pick document root)
//!     → resolver.rs (safe filesystem path)
//!     → probe.rs (directory / file / template / absent)
//!     → render | read | listing | error page
//!     → response with Content-Type + cache pair
//! ```
//!
//! # Design Decisions
//! - An unsafe resolution renders exactly like a 404: the client can
//!   never tell whether the path would have existed outside the root
//! - Each request runs in its own task; a panic anywhere below becomes a
//!   500 with the generic catalog reason, never a dead worker
//! - Error pages go through the same template mechanism as success pages,
//!   so headers stay consistent across every outcome

use axum::body::Body;
use axum::http::{Response, StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::http::request::RequestContext;
use crate::http::response::{finish, status_page};
use crate::http::server::AppState;
use crate::render::{self, PageInputs};
use crate::routing::probe::{self, DispatchOutcome, IndexKind};
use crate::routing::{resolver, vhost};

/// Error taxonomy of the serving pipeline.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Traversal attempt or unreadable root; rendered as 404.
    #[error("path resolution escaped the document root")]
    ResolutionUnsafe,
    #[error("no such file or directory")]
    NotFound,
    #[error("directory listing disabled")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error("internal fault: {0}")]
    Internal(String),
}

impl ServeError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServeError::ResolutionUnsafe | ServeError::NotFound => 404,
            ServeError::Forbidden => 403,
            ServeError::BadRequest(_) => 400,
            ServeError::Internal(_) => 500,
        }
    }
}

/// Serve one request, confining every failure mode to a status page.
pub async fn dispatch(state: AppState, ctx: RequestContext) -> Response<Body> {
    let outer = state.clone();
    let handle = tokio::spawn(run(state, ctx));
    // When the client disconnects, hyper drops this future; the guard then
    // abandons any pending filesystem or template work.
    let _guard = AbortOnDrop(handle.abort_handle());
    match handle.await {
        Ok(response) => response,
        // The request task panicked; the worker itself stays up.
        Err(err) => {
            tracing::error!(error = %err, "request task aborted");
            error_page(&outer, &ServeError::Internal("request task aborted".to_string()))
        }
    }
}

struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run(state: AppState, mut ctx: RequestContext) -> Response<Body> {
    match serve(&state, &mut ctx).await {
        Ok(response) => response,
        Err(err) => error_page(&state, &err),
    }
}

/// Render the status page for a taxonomy entry, logging the operator-side
/// detail the client never sees.
pub fn error_page(state: &AppState, err: &ServeError) -> Response<Body> {
    let code = err.status_code();
    tracing::error!(code, reason = state.status.reason(code), detail = %err, "request failed");
    status_page(&state.config, &state.status, code, &[])
}

async fn serve(
    state: &AppState,
    ctx: &mut RequestContext,
) -> Result<Response<Body>, ServeError> {
    // Resolving
    let root = vhost::document_root(&state.config, ctx.host.as_deref()).to_path_buf();
    let target = resolver::resolve(&root, &ctx.path).await;

    state
        .access_log
        .record(
            ctx.host.as_deref(),
            &target.path,
            &ctx.client_addr,
            &ctx.user_agent,
        )
        .await;

    // Probing
    match probe::probe(&target, &state.classifier).await {
        DispatchOutcome::Directory {
            index: Some(IndexKind::Template),
            ..
        } => {
            let index_path = target.path.join(probe::TEMPLATE_INDEX);
            let source = tokio::fs::read(&index_path)
                .await
                .map_err(|err| ServeError::BadRequest(format!("index read failed: {err}")))?;
            render_template(state, ctx, &source).await
        }
        DispatchOutcome::Directory {
            index: Some(IndexKind::Html),
            ..
        } => {
            // Plain index is served verbatim, never rendered.
            serve_static(state, &target.path.join(probe::HTML_INDEX), "text/html").await
        }
        DispatchOutcome::Directory { index: None, entries } => {
            if ctx.is_site_root() {
                welcome(state)
            } else if state.config.indexof.is_on() {
                listing(state, ctx, entries)
            } else {
                Err(ServeError::Forbidden)
            }
        }
        DispatchOutcome::TemplatePage { source } => render_template(state, ctx, &source).await,
        DispatchOutcome::StaticFile { content_type } => {
            serve_static(state, &target.path, &content_type).await
        }
        DispatchOutcome::Missing => Err(ServeError::NotFound),
        DispatchOutcome::Forbidden => Err(ServeError::Forbidden),
        DispatchOutcome::ResolutionError => Err(ServeError::ResolutionUnsafe),
        DispatchOutcome::ReadFailure => {
            Err(ServeError::BadRequest("filesystem error".to_string()))
        }
    }
}

/// Rendering: template source + request context through the engine.
async fn render_template(
    state: &AppState,
    ctx: &mut RequestContext,
    source: &[u8],
) -> Result<Response<Body>, ServeError> {
    let source = String::from_utf8_lossy(source).into_owned();
    let define = render::load_define(&state.define_path).await;

    let mut inputs = PageInputs {
        post: ctx.post_params().await?,
        get: ctx.query.clone(),
        cookie: ctx.cookies.clone(),
        define,
    };
    if state.config.escapehtml.is_on() {
        inputs.post.map_strings(render::escape_html);
        inputs.get.map_strings(render::escape_html);
        inputs.cookie.map_strings(render::escape_html);
    }

    let page = render::render_page(&source, &inputs)
        .map_err(|err| ServeError::BadRequest(format!("template render failed: {err}")))?;

    Ok(finish(
        &state.config.cache,
        StatusCode::OK,
        "text/html",
        &page.headers,
        page.body,
    ))
}

/// Reading: file bytes, with UTF-8 decoding for text and the optional
/// JavaScript strip transform.
async fn serve_static(
    state: &AppState,
    path: &std::path::Path,
    content_type: &str,
) -> Result<Response<Body>, ServeError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ServeError::NotFound
        } else {
            ServeError::BadRequest(format!("read failed: {err}"))
        }
    })?;

    let is_text = content_type.starts_with("text/") || content_type == "text/javascript";
    let body = if content_type == "text/javascript" && state.config.escapejs.is_on() {
        strip_js(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else if is_text {
        String::from_utf8_lossy(&bytes).into_owned().into_bytes()
    } else {
        bytes
    };

    Ok(finish(
        &state.config.cache,
        StatusCode::OK,
        content_type,
        &[],
        body,
    ))
}

/// The site root with no index at all gets the built-in welcome page,
/// rendered with the active configuration.
fn welcome(state: &AppState) -> Result<Response<Body>, ServeError> {
    let page = render::render_one_off(state.pages.welcome(), &json!({ "config": &*state.config }))
        .map_err(|err| ServeError::Internal(format!("welcome render failed: {err}")))?;
    Ok(finish(
        &state.config.cache,
        StatusCode::OK,
        "text/html",
        &page.headers,
        page.body,
    ))
}

/// Listing: the built-in directory index over sorted entry names.
fn listing(
    state: &AppState,
    ctx: &RequestContext,
    mut entries: Vec<String>,
) -> Result<Response<Body>, ServeError> {
    entries.sort();
    let mut path = ctx.decoded_path();
    if !path.ends_with('/') {
        path.push('/');
    }
    let context = json!({
        "path": path,
        "platform": std::env::consts::OS,
        "host": ctx.host.as_deref().unwrap_or("localhost"),
        "entries": entries,
    });
    let page = render::render_one_off(state.pages.listing(), &context)
        .map_err(|err| ServeError::Internal(format!("listing render failed: {err}")))?;
    Ok(finish(
        &state.config.cache,
        StatusCode::OK,
        "text/html",
        &page.headers,
        page.body,
    ))
}

/// Strip comments and squeeze whitespace out of a JavaScript source.
///
/// Line comments are only recognized at line start or after whitespace, so
/// `https://` URLs survive. Unterminated block comments drop the tail.
pub fn strip_js(source: &str) -> String {
    let without_blocks = strip_block_comments(source);
    let mut joined = String::with_capacity(without_blocks.len());
    for line in without_blocks.lines() {
        joined.push_str(strip_line_comment(line));
    }
    collapse_spaces(&joined)
}

fn strip_block_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut from = 0;
    while let Some(found) = line[from..].find("//") {
        let at = from + found;
        let after_colon = at > 0 && bytes[at - 1] == b':';
        let at_start_or_space = at == 0 || bytes[at - 1].is_ascii_whitespace();
        if after_colon || !at_start_or_space {
            from = at + 2;
            continue;
        }
        // The whitespace introducing the comment goes with it.
        return line[..at].trim_end();
    }
    line
}

fn collapse_spaces(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut previous_space = false;
    for c in source.chars() {
        if c == ' ' {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_block_comments() {
        assert_eq!(strip_js("let a = 1; /* gone */ let b = 2;"), "let a = 1; let b = 2;");
        assert_eq!(strip_js("a /* multi\nline */ b"), "a b");
    }

    #[test]
    fn strips_line_comments_but_keeps_urls() {
        assert_eq!(strip_js("let x = 1; // note"), "let x = 1;");
        assert_eq!(
            strip_js("fetch('https://example.org/a');"),
            "fetch('https://example.org/a');"
        );
        assert_eq!(strip_js("// whole line"), "");
    }

    #[test]
    fn collapses_spaces_and_removes_newlines() {
        assert_eq!(strip_js("a    b\nc"), "a bc");
        assert_eq!(strip_js("a  b   c"), "a b c");
    }

    #[test]
    fn unterminated_block_comment_drops_tail() {
        assert_eq!(strip_js("keep; /* never closed"), "keep;");
    }

    #[test]
    fn error_codes_match_taxonomy() {
        assert_eq!(ServeError::ResolutionUnsafe.status_code(), 404);
        assert_eq!(ServeError::NotFound.status_code(), 404);
        assert_eq!(ServeError::Forbidden.status_code(), 403);
        assert_eq!(ServeError::BadRequest(String::new()).status_code(), 400);
        assert_eq!(ServeError::Internal(String::new()).status_code(), 500);
    }
}
