//! Access logging.
//!
//! One line per request:
//! `[<ISO-8601>] <host> <resolved-path> <= <client-ip> <user-agent> PID=<pid>`
//!
//! When logging is enabled the line is appended to the configured file;
//! otherwise it is mirrored to the process console. Each line is written
//! with a single syscall, so concurrent workers may interleave lines but
//! never corrupt one.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::config::LogConfig;

#[derive(Debug)]
pub struct AccessLog {
    destination: Option<PathBuf>,
}

impl AccessLog {
    pub fn from_config(config: &LogConfig) -> Self {
        Self {
            destination: config.status.is_on().then(|| config.path()),
        }
    }

    /// Record one request.
    pub async fn record(
        &self,
        host: Option<&str>,
        resolved_path: &Path,
        client_addr: &str,
        user_agent: &str,
    ) {
        let line = format_line(host, resolved_path, client_addr, user_agent);
        match &self.destination {
            Some(path) => {
                if let Err(err) = append_line(path, &line).await {
                    tracing::error!(path = %path.display(), error = %err, "log write error");
                }
            }
            None => tracing::info!(target: "access", "{}", line.trim_end()),
        }
    }
}

fn format_line(host: Option<&str>, resolved_path: &Path, client_addr: &str, user_agent: &str) -> String {
    format!(
        "[{}] {} {} <= {} {} PID={}\n",
        chrono::Local::now().to_rfc3339(),
        host.unwrap_or("-"),
        resolved_path.display(),
        client_addr,
        user_agent,
        std::process::id(),
    )
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await
}
