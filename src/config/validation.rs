//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port within the allowed set)
//! - Check cross-field requirements (TLS material when port is 443)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use thiserror::Error;

use crate::config::schema::ServerConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("port {0} not allowed, use 80, 443, or 1024-65535")]
    PortOutOfRange(u16),
    #[error("document_root must not be empty")]
    EmptyDocumentRoot,
    #[error("virtual host {0:?} has an empty document_root")]
    EmptyVirtualRoot(String),
    #[error("port 443 requires ssl_key_file and ssl_cert_file")]
    MissingTlsMaterial,
    #[error("CACHE.max_age must be greater than zero when caching is on")]
    ZeroMaxAge,
}

/// Validate a loaded configuration, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !matches!(config.port, 80 | 443 | 1024..=65535) {
        errors.push(ValidationError::PortOutOfRange(config.port));
    }

    if config.document_root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDocumentRoot);
    }

    for (host, vhost) in &config.virtual_hosts {
        if vhost.document_root.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyVirtualRoot(host.clone()));
        }
    }

    if config.port == 443 && (config.ssl_key_file.is_none() || config.ssl_cert_file.is_none()) {
        errors.push(ValidationError::MissingTlsMaterial);
    }

    if config.cache.status.is_on() && config.cache.max_age == 0 {
        errors.push(ValidationError::ZeroMaxAge);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
