//! Basic authentication gate.
//!
//! When enabled, every request is checked before the routing pipeline
//! runs: missing or invalid credentials short-circuit with the standard
//! challenge and the pipeline is never invoked.

use axum::body::Body;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::http::response::status_page;
use crate::http::server::AppState;

/// One `user:password` pair from the credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub password: String,
}

/// Parse a credential file: one `user:password` per line, blank lines and
/// `#` comments ignored.
pub fn parse_credentials(content: &str) -> Vec<Credential> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(user, password)| Credential {
            user: user.to_string(),
            password: password.to_string(),
        })
        .collect()
}

/// Middleware: pass authenticated requests through, answer 401 otherwise.
pub async fn basic_auth_gate(
    axum::extract::State(state): axum::extract::State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(credentials) = &state.credentials else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| verify(value, credentials))
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }

    let challenge = (
        header::WWW_AUTHENTICATE.to_string(),
        format!("Basic realm=\"{}\"", state.config.title),
    );
    status_page(&state.config, &state.status, 401, &[challenge])
}

fn verify(header_value: &str, credentials: &[Credential]) -> bool {
    let Some(encoded) = header_value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(pair) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, password)) = pair.split_once(':') else {
        return false;
    };
    credentials
        .iter()
        .any(|c| c.user == user && c.password == password)
}
