//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Default to a sensible filter when `RUST_LOG` is unset
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Coordinator and workers share the same setup; worker output is
//!   inherited by the coordinator's stdio

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tera_httpd=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
