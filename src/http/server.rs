//! HTTP server setup.
//!
//! # Responsibilities
//! - Build per-worker state (config snapshot, tables, built-in pages)
//! - Create the Axum router with the fallback file-serving handler
//! - Wire up middleware (auth gate, timeout, body limit, tracing)
//! - Run the worker startup sequence: TLS, bind, privilege drop, serve
//!
//! # Design Decisions
//! - TLS configuration and the privileged bind are two sequential named
//!   steps, not fallthrough: "configure TLS if port is 443", then "bind
//!   and, if privileged, drop privileges"
//! - Every request is answered by the same fallback handler; there is no
//!   route table to get out of sync with the filesystem

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware;
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::auth::{self, Credential};
use crate::http::request::{RequestContext, MAX_BODY_BYTES};
use crate::http::response::{BuiltinPages, StatusCatalog};
use crate::net;
use crate::observability::AccessLog;
use crate::routing::pipeline;
use crate::routing::ContentClassifier;
use crate::supervisor;

/// Upper bound on one request/response exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for worker startup and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to parse embedded table: {0}")]
    Tables(#[from] serde_json::Error),
    #[error("failed to read credential file {path}: {source}")]
    Credentials {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Bind(#[from] net::ListenerError),
    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),
    #[error("port 443 requires ssl_key_file and ssl_cert_file")]
    MissingTlsMaterial,
    #[error(transparent)]
    PrivilegeDrop(#[from] supervisor::PrivilegeError),
    #[error("server I/O error: {0}")]
    Serve(std::io::Error),
}

/// Per-worker state injected into handlers. Everything here is read-only
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub classifier: Arc<ContentClassifier>,
    pub status: Arc<StatusCatalog>,
    pub pages: Arc<BuiltinPages>,
    pub access_log: Arc<AccessLog>,
    pub define_path: Arc<PathBuf>,
    /// Present only when the basic-auth gate is enabled.
    pub credentials: Option<Arc<Vec<Credential>>>,
}

impl AppState {
    /// Assemble worker state from a validated configuration.
    pub fn build(config: ServerConfig, define_path: PathBuf) -> Result<Self, ServerError> {
        let credentials = if config.basic.status.is_on() {
            let path = config.basic.path();
            let content =
                std::fs::read_to_string(&path).map_err(|source| ServerError::Credentials {
                    path: path.clone(),
                    source,
                })?;
            Some(Arc::new(auth::parse_credentials(&content)))
        } else {
            None
        };

        Ok(Self {
            classifier: Arc::new(ContentClassifier::from_embedded()?),
            status: Arc::new(StatusCatalog::from_embedded()?),
            pages: Arc::new(BuiltinPages),
            access_log: Arc::new(AccessLog::from_config(&config.log)),
            define_path: Arc::new(define_path),
            credentials,
            config: Arc::new(config),
        })
    }
}

/// HTTP server for one worker process.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(config: ServerConfig, define_path: PathBuf) -> Result<Self, ServerError> {
        Ok(Self {
            state: AppState::build(config, define_path)?,
        })
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(serve_request)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                auth::basic_auth_gate,
            ))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the worker: TLS step, bind step, then serve until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let config = self.state.config.clone();
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

        // Step 1: configure TLS when serving on 443.
        let tls = if config.port == 443 {
            let (Some(cert), Some(key)) = (&config.ssl_cert_file, &config.ssl_key_file) else {
                return Err(ServerError::MissingTlsMaterial);
            };
            Some(
                net::tls::load_tls_config(cert, key)
                    .await
                    .map_err(ServerError::Tls)?,
            )
        } else {
            None
        };

        // Step 2: bind and, if the port is privileged, drop privileges.
        let listener = net::bind_reuse_port(addr)?;
        if config.port < 1024 {
            supervisor::drop_privileges(config.system_user.as_deref())?;
        }

        if config.log.status.is_on() {
            if let Err(err) = tokio::fs::create_dir_all(&config.log.dir).await {
                tracing::warn!(dir = %config.log.dir.display(), error = %err, "cannot create log directory");
            }
        }

        tracing::info!(
            pid = std::process::id(),
            address = %addr,
            tls = tls.is_some(),
            "worker serving"
        );

        let app = Self::build_router(self.state)
            .into_make_service_with_connect_info::<SocketAddr>();

        match tls {
            Some(tls_config) => axum_server::from_tcp_rustls(listener, tls_config)
                .serve(app)
                .await
                .map_err(ServerError::Serve)?,
            None => {
                let listener =
                    tokio::net::TcpListener::from_std(listener).map_err(ServerError::Serve)?;
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
                    .map_err(ServerError::Serve)?;
            }
        }

        tracing::info!("worker stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the routing pipeline.
async fn serve_request(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let ctx = RequestContext::from_request(request, peer);
    pipeline::dispatch(state, ctx).await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
