//! Virtual-host resolution.
//!
//! # Responsibilities
//! - Map a Host header value to the document root to serve from
//! - Fall back to the global default root for absent or unknown hosts
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec); any `:port`
//!   suffix is ignored
//! - Pure function, no I/O, no error path

use std::path::Path;

use crate::config::ServerConfig;

/// Select the document root for a request.
pub fn document_root<'a>(config: &'a ServerConfig, host: Option<&str>) -> &'a Path {
    let Some(host) = host else {
        return &config.document_root;
    };
    let name = host.split(':').next().unwrap_or(host);

    config
        .virtual_hosts
        .iter()
        .find(|(configured, _)| configured.eq_ignore_ascii_case(name))
        .map(|(_, vhost)| vhost.document_root.as_path())
        .unwrap_or(&config.document_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VirtualHostConfig;
    use std::path::PathBuf;

    fn config_with_vhost() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.document_root = PathBuf::from("/srv/default");
        config.virtual_hosts.insert(
            "blog.example.org".to_string(),
            VirtualHostConfig {
                document_root: PathBuf::from("/srv/blog"),
            },
        );
        config
    }

    #[test]
    fn configured_host_gets_override() {
        let config = config_with_vhost();
        assert_eq!(
            document_root(&config, Some("blog.example.org")),
            Path::new("/srv/blog")
        );
    }

    #[test]
    fn match_is_case_insensitive_and_ignores_port() {
        let config = config_with_vhost();
        assert_eq!(
            document_root(&config, Some("BLOG.Example.ORG:8080")),
            Path::new("/srv/blog")
        );
    }

    #[test]
    fn unknown_or_absent_host_falls_back() {
        let config = config_with_vhost();
        assert_eq!(
            document_root(&config, Some("other.example.org")),
            Path::new("/srv/default")
        );
        assert_eq!(document_root(&config, None), Path::new("/srv/default"));
    }
}
