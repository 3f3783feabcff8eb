//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (parse & deserialize, apply CLI overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc by every worker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a change requires a restart
//! - All fields have defaults to allow minimal configs
//! - The definitions file (`define.json`) is the one hot-reloadable input;
//!   it is re-read per render, never cached here

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{define_path, load, ConfigError};
pub use schema::{
    BasicAuthConfig, CacheConfig, LogConfig, ServerConfig, Toggle, VirtualHostConfig,
};
