//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Worker startup
//!     → tls.rs (load PEM material when serving on 443)
//!     → listener.rs (SO_REUSEPORT bind)
//!     → hand the socket to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Every worker owns its listener; nothing is inherited across exec
//! - TLS is decided once at startup by the configured port, never
//!   negotiated per connection

pub mod listener;
pub mod tls;

pub use listener::{bind_reuse_port, ListenerError};
