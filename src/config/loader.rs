//! Configuration loading from disk.
//!
//! Order of precedence: config file, then CLI overrides, then validation.
//! Workers re-run the same sequence on the same inputs, so every process
//! ends up with an identical snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::Cli;
use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the config file, apply CLI overrides, and validate the result.
pub fn load(cli: &Cli) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(&cli.config).map_err(|source| ConfigError::Io {
        path: cli.config.clone(),
        source,
    })?;
    let mut config: ServerConfig = serde_json::from_str(&content)?;

    apply_overrides(&mut config, cli);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Path of the hot-reloadable definitions file: `define.json` next to the
/// config file.
pub fn define_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("define.json")
}

fn apply_overrides(config: &mut ServerConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.dir {
        config.document_root = dir.clone();
    }
    if let Some(basic) = cli.basic {
        config.basic.status = basic;
    }
    if let Some(log) = cli.log {
        config.log.status = log;
    }
    if let Some(indexof) = cli.indexof {
        config.indexof = indexof;
    }
    if let Some(escapejs) = cli.escapejs {
        config.escapejs = escapejs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli_with_config(path: &Path, extra: &[&str]) -> Cli {
        let mut args = vec!["tera-httpd", "--config"];
        let path = path.to_str().unwrap();
        args.push(path);
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_validates_file() {
        let file = write_config(r#"{ "port": 8080, "document_root": "/srv/www" }"#);
        let cli = cli_with_config(file.path(), &[]);
        let config = load(&cli).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.document_root, PathBuf::from("/srv/www"));
    }

    #[test]
    fn cli_overrides_replace_only_named_fields() {
        let file = write_config(
            r#"{ "port": 8080, "indexof": "off", "LOG": { "status": "off" }, "escapehtml": "on" }"#,
        );
        let cli = cli_with_config(
            file.path(),
            &["--port", "9090", "--indexof", "on", "--log", "on"],
        );
        let config = load(&cli).unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.indexof.is_on());
        assert!(config.log.status.is_on());
        // untouched by any flag
        assert!(config.escapehtml.is_on());
        assert!(!config.escapejs.is_on());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let file = write_config(r#"{ "port": 81 }"#);
        let cli = cli_with_config(file.path(), &[]);
        assert!(matches!(load(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn define_path_is_sibling_of_config() {
        assert_eq!(
            define_path(Path::new("etc/config.json")),
            PathBuf::from("etc/define.json")
        );
    }
}
