//! Template rendering integration.
//!
//! # Data Flow
//! ```text
//! template source (bytes from the document root or a built-in page)
//!     + POST/GET/COOKIE maps (escaped per policy)
//!     + DEFINE map (re-read from define.json per request)
//!     → one-off Tera instance with a `set_header` function
//!     → rendered body + headers the template set
//! ```
//!
//! # Design Decisions
//! - A fresh `Tera` per render keeps workers stateless; page sources come
//!   from the probe, never from a preloaded template directory
//! - `set_header(name=..., value=...)` is the response-writer handle:
//!   calls are collected and applied before the body is flushed
//! - Escaping request values is the pipeline's job, not the engine's;
//!   the engine receives already-sanitized context values
//! - A missing or invalid definitions file degrades to an empty map

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tera::Tera;

use crate::http::request::ParamMap;

/// Result of one template render.
#[derive(Debug)]
pub struct RenderedPage {
    pub body: Vec<u8>,
    /// Headers the template set through `set_header`, in call order.
    pub headers: Vec<(String, String)>,
}

/// Request-derived context for a page render.
#[derive(Debug, Default)]
pub struct PageInputs {
    pub post: ParamMap,
    pub get: ParamMap,
    pub cookie: ParamMap,
    pub define: Map<String, Value>,
}

/// Response-writer handle exposed to templates.
#[derive(Clone)]
struct SetHeader {
    sink: Arc<Mutex<Vec<(String, String)>>>,
}

impl tera::Function for SetHeader {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("set_header requires a string `name`"))?;
        let value = args
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("set_header requires a string `value`"))?;
        if let Ok(mut sink) = self.sink.lock() {
            sink.push((name.to_string(), value.to_string()));
        }
        Ok(Value::Null)
    }
}

/// Render a page template with the request context.
pub fn render_page(source: &str, inputs: &PageInputs) -> Result<RenderedPage, tera::Error> {
    let mut context = tera::Context::new();
    context.insert("POST", &inputs.post.to_object());
    context.insert("GET", &inputs.get.to_object());
    context.insert("COOKIE", &inputs.cookie.to_object());
    context.insert("DEFINE", &inputs.define);
    render(source, &context)
}

/// Render a built-in page with an arbitrary serialized context.
pub fn render_one_off(source: &str, context: &Value) -> Result<RenderedPage, tera::Error> {
    let context = tera::Context::from_serialize(context)?;
    render(source, &context)
}

fn render(source: &str, context: &tera::Context) -> Result<RenderedPage, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("page", source)?;

    let sink = Arc::new(Mutex::new(Vec::new()));
    tera.register_function("set_header", SetHeader { sink: sink.clone() });

    let body = tera.render("page", context)?.into_bytes();
    let headers = sink.lock().map(|headers| headers.clone()).unwrap_or_default();
    Ok(RenderedPage { body, headers })
}

/// Re-read the hot-reloadable definitions file. Absent or malformed files
/// yield an empty mapping rather than an error.
pub async fn load_define(path: &Path) -> Map<String, Value> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed definitions file");
                Map::new()
            }
        },
        Err(_) => Map::new(),
    }
}

/// Escape `& < > " '` for safe interpolation into HTML.
pub fn escape_html(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_request_context_fields() {
        let mut inputs = PageInputs::default();
        inputs.post.insert_str("name", "ada");
        inputs.get.insert_str("page", "2");
        inputs.cookie.insert_str("session", "xyz");
        inputs.define.insert("SITE_NAME".into(), json!("demo"));

        let page = render_page(
            "{{ POST.name }}/{{ GET.page }}/{{ COOKIE.session }}/{{ DEFINE.SITE_NAME }}",
            &inputs,
        )
        .unwrap();
        assert_eq!(page.body, b"ada/2/xyz/demo");
    }

    #[test]
    fn set_header_collects_calls_in_order() {
        let page = render_page(
            "{{ set_header(name=\"x-first\", value=\"1\") }}{{ set_header(name=\"x-second\", value=\"2\") }}ok",
            &PageInputs::default(),
        )
        .unwrap();
        assert_eq!(
            page.headers,
            vec![
                ("x-first".to_string(), "1".to_string()),
                ("x-second".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn broken_template_errors_out() {
        assert!(render_page("{{ unclosed", &PageInputs::default()).is_err());
        assert!(render_page("{{ missing_variable }}", &PageInputs::default()).is_err());
    }

    #[test]
    fn one_off_accepts_json_context() {
        let page = render_one_off("{{ STATUS }}", &json!({ "STATUS": "404 Not Found" })).unwrap();
        assert_eq!(page.body, b"404 Not Found");
    }

    #[tokio::test]
    async fn missing_define_file_is_empty() {
        let map = load_define(Path::new("/nonexistent/define.json")).await;
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn define_file_is_read_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("define.json");
        std::fs::write(&path, r#"{"A":"1"}"#).unwrap();
        assert_eq!(load_define(&path).await.get("A"), Some(&json!("1")));
        std::fs::write(&path, r#"{"A":"2"}"#).unwrap();
        assert_eq!(load_define(&path).await.get("A"), Some(&json!("2")));
    }

    #[test]
    fn escape_html_covers_all_five() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }
}
