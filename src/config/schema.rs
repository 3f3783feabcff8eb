//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from the JSON config
//! file; the same structure is serialized back out for `--show config`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An `"on"`/`"off"` switch as it appears throughout the config file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    On,
    #[default]
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        matches!(self, Toggle::On)
    }
}

/// Root configuration for the server.
///
/// Loaded once at startup, frozen thereafter. Every worker holds its own
/// copy behind an `Arc`; nothing mutates it at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port (80, 443, or 1024-65535).
    pub port: u16,

    /// Default document root for requests with no virtual-host override.
    pub document_root: PathBuf,

    /// Per-virtual-host document-root overrides, keyed by host name.
    #[serde(rename = "VIRTUAL")]
    pub virtual_hosts: HashMap<String, VirtualHostConfig>,

    /// Access log settings.
    #[serde(rename = "LOG")]
    pub log: LogConfig,

    /// Response cache policy.
    #[serde(rename = "CACHE")]
    pub cache: CacheConfig,

    /// Basic authentication gate.
    #[serde(rename = "BASIC")]
    pub basic: BasicAuthConfig,

    /// Directory listings for indexless directories.
    pub indexof: Toggle,

    /// Comment/whitespace stripping for served JavaScript.
    pub escapejs: Toggle,

    /// HTML-escaping of request values before they reach templates.
    pub escapehtml: Toggle,

    /// Account to drop to after binding a privileged port.
    pub system_user: Option<String>,

    /// TLS private key (PEM), required when `port` is 443.
    pub ssl_key_file: Option<PathBuf>,

    /// TLS certificate (PEM), required when `port` is 443.
    pub ssl_cert_file: Option<PathBuf>,

    /// Server name used in banners and rendered pages.
    pub title: String,

    /// Version string reported by `--version`.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            document_root: PathBuf::from("www"),
            virtual_hosts: HashMap::new(),
            log: LogConfig::default(),
            cache: CacheConfig::default(),
            basic: BasicAuthConfig::default(),
            indexof: Toggle::Off,
            escapejs: Toggle::Off,
            escapehtml: Toggle::On,
            system_user: None,
            ssl_key_file: None,
            ssl_cert_file: None,
            title: "tera-httpd".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Document-root override for one virtual host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualHostConfig {
    pub document_root: PathBuf,
}

/// Access log settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub status: Toggle,
    pub dir: PathBuf,
    pub file: String,
}

impl LogConfig {
    /// Full path of the access log file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            status: Toggle::Off,
            dir: PathBuf::from("log"),
            file: "access.log".to_string(),
        }
    }
}

/// Response cache policy: a flag plus the advertised max-age.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub status: Toggle,
    pub max_age: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            status: Toggle::Off,
            max_age: 3600,
        }
    }
}

/// Basic authentication settings. The credential file holds one
/// `user:password` pair per line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub status: Toggle,
    pub dir: PathBuf,
    pub file: String,
}

impl BasicAuthConfig {
    /// Full path of the credential file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            status: Toggle::Off,
            dir: PathBuf::from("etc"),
            file: "htpasswd".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trips_on_off() {
        assert_eq!(serde_json::from_str::<Toggle>("\"on\"").unwrap(), Toggle::On);
        assert_eq!(serde_json::from_str::<Toggle>("\"off\"").unwrap(), Toggle::Off);
        assert_eq!(serde_json::to_string(&Toggle::On).unwrap(), "\"on\"");
        assert!(serde_json::from_str::<Toggle>("\"yes\"").is_err());
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config: ServerConfig = serde_json::from_str("{\"port\": 9000}").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.document_root, PathBuf::from("www"));
        assert!(!config.cache.status.is_on());
        assert_eq!(config.log.path(), PathBuf::from("log/access.log"));
    }

    #[test]
    fn uppercase_sections_deserialize() {
        let raw = r#"{
            "VIRTUAL": { "blog.example.org": { "document_root": "/srv/blog" } },
            "CACHE": { "status": "on", "max_age": 60 }
        }"#;
        let config: ServerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(
            config.virtual_hosts["blog.example.org"].document_root,
            PathBuf::from("/srv/blog")
        );
        assert!(config.cache.status.is_on());
        assert_eq!(config.cache.max_age, 60);
    }
}
