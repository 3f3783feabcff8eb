//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → access.rs (one line per request, file or console)
//! ```
//!
//! # Design Decisions
//! - Structured process logs and the flat access log are separate sinks
//! - Access log lines are single-write atomic; interleaving across
//!   workers is acceptable, corruption is not

pub mod access;
pub mod logging;

pub use access::AccessLog;
