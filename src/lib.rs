//! Template-aware multi-process HTTP file server library.

pub mod cli;
pub mod config;
pub mod http;
pub mod net;
pub mod observability;
pub mod render;
pub mod routing;
pub mod supervisor;

pub use config::ServerConfig;
pub use http::{AppState, HttpServer};
