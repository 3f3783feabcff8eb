//! Worker supervision and process privileges.
//!
//! # Data Flow
//! ```text
//! coordinator (this module)
//!     → spawn one worker process per logical CPU (`--worker` re-exec)
//!     → wait on child exit
//!     → respawn immediately, forever
//!
//! worker (http::server)
//!     → SO_REUSEPORT bind → privilege drop → serve
//! ```
//!
//! # Design Decisions
//! - Workers are full OS processes sharing nothing but the listening
//!   port; the only coordination channel is spawn and exit status
//! - Restart is eager, with one damping rule: a worker that dies within
//!   a second of spawning delays its replacement briefly so a broken
//!   config cannot hot-loop the coordinator
//! - Privilege drop is fatal on failure when the port requires it

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use nix::unistd::{setgid, setuid, User};
use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::config::ServerConfig;

/// Account used when the config names none.
const DEFAULT_SYSTEM_USER: &str = "www";

/// A worker living shorter than this is treated as crash-looping.
const CRASH_LOOP_WINDOW: Duration = Duration::from_secs(1);
const RESPAWN_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("cannot determine server executable: {0}")]
    Executable(std::io::Error),
    #[error("port {0} requires starting with elevated privileges")]
    RequiresRoot(u16),
}

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("unknown system user {0:?}")]
    UnknownUser(String),
    #[error("user lookup failed: {0}")]
    Lookup(nix::Error),
    #[error("failed to drop privileges to {user:?}: {source}")]
    Drop { user: String, source: nix::Error },
}

/// Run the coordinator: keep one worker per CPU alive until shutdown.
pub async fn run(config: &ServerConfig) -> Result<(), SupervisorError> {
    // A privileged port needs root now; workers drop right after binding.
    if config.port < 1024 && !nix::unistd::Uid::effective().is_root() {
        return Err(SupervisorError::RequiresRoot(config.port));
    }

    let workers = num_cpus::get();
    let exe = std::env::current_exe().map_err(SupervisorError::Executable)?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    tracing::info!(
        pid = std::process::id(),
        port = config.port,
        workers,
        "coordinator starting worker pool"
    );

    let mut pool: JoinSet<WorkerExit> = JoinSet::new();
    for id in 0..workers {
        spawn_worker(&mut pool, &exe, &args, id);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received, stopping workers");
                pool.shutdown().await;
                return Ok(());
            }
            Some(joined) = pool.join_next() => {
                match joined {
                    Ok(exit) => {
                        tracing::warn!(
                            worker = exit.id,
                            status = ?exit.status,
                            lifetime_ms = exit.lifetime.as_millis() as u64,
                            "worker exited, respawning"
                        );
                        if exit.lifetime < CRASH_LOOP_WINDOW {
                            tokio::time::sleep(RESPAWN_DELAY).await;
                        }
                        spawn_worker(&mut pool, &exe, &args, exit.id);
                    }
                    Err(err) => tracing::error!(error = %err, "worker watcher failed"),
                }
            }
        }
    }
}

struct WorkerExit {
    id: usize,
    status: Option<ExitStatus>,
    lifetime: Duration,
}

fn spawn_worker(pool: &mut JoinSet<WorkerExit>, exe: &Path, args: &[OsString], id: usize) {
    let exe = exe.to_path_buf();
    let args = args.to_vec();
    pool.spawn(async move {
        let started = Instant::now();
        let status = match Command::new(&exe)
            .args(worker_args(&args))
            .kill_on_drop(true)
            .spawn()
        {
            Ok(mut child) => {
                tracing::info!(worker = id, pid = child.id(), "worker spawned");
                child.wait().await.ok()
            }
            Err(err) => {
                tracing::error!(worker = id, error = %err, "failed to spawn worker");
                None
            }
        };
        WorkerExit {
            id,
            status,
            lifetime: started.elapsed(),
        }
    });
}

/// Drop to the configured unprivileged account after a privileged bind.
pub fn drop_privileges(account: Option<&str>) -> Result<(), PrivilegeError> {
    if account.is_none() {
        tracing::warn!(
            "no system_user configured, falling back to {:?}",
            DEFAULT_SYSTEM_USER
        );
    }
    let name = account.unwrap_or(DEFAULT_SYSTEM_USER);

    let user = User::from_name(name)
        .map_err(PrivilegeError::Lookup)?
        .ok_or_else(|| PrivilegeError::UnknownUser(name.to_string()))?;

    // Group first; once the uid is gone, setgid would be denied.
    setgid(user.gid).map_err(|source| PrivilegeError::Drop {
        user: name.to_string(),
        source,
    })?;
    setuid(user.uid).map_err(|source| PrivilegeError::Drop {
        user: name.to_string(),
        source,
    })?;

    tracing::info!(user = name, uid = user.uid.as_raw(), "dropped privileges");
    Ok(())
}

/// Argument vector for a worker re-exec: the coordinator's own flags plus
/// the hidden `--worker`.
fn worker_args(base: &[OsString]) -> Vec<OsString> {
    let mut args = base.to_vec();
    args.push(OsString::from("--worker"));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_args_append_worker_flag() {
        let base = vec![OsString::from("--port"), OsString::from("9000")];
        let args = worker_args(&base);
        assert_eq!(args.last().unwrap(), "--worker");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn unknown_user_is_reported() {
        let err = drop_privileges(Some("no-such-user-tera-httpd")).unwrap_err();
        assert!(matches!(err, PrivilegeError::UnknownUser(_)));
    }
}
