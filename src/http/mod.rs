//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, worker startup sequence)
//!     → auth.rs (basic-auth gate, before any routing)
//!     → request.rs (context extraction, body parsing)
//!     → [routing pipeline decides the outcome]
//!     → response.rs (content type, cache pair, status pages)
//!     → send to client
//! ```

pub mod auth;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ParamMap, RequestContext};
pub use response::StatusCatalog;
pub use server::{AppState, HttpServer, ServerError};
