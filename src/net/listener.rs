//! Shared-port listener setup.
//!
//! # Responsibilities
//! - Bind one listening socket per worker on the same port
//! - Let the kernel balance accepted connections across workers
//!
//! # Design Decisions
//! - `SO_REUSEPORT` instead of passing a socket between processes: every
//!   worker binds independently, so a respawned worker needs no handoff
//! - Sockets are created non-blocking, ready for the tokio reactor

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

const ACCEPT_BACKLOG: i32 = 1024;

/// Create a `SO_REUSEPORT` listener for one worker.
pub fn bind_reuse_port(addr: SocketAddr) -> Result<std::net::TcpListener, ListenerError> {
    let bind = |addr: SocketAddr| -> std::io::Result<std::net::TcpListener> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        // The kernel load-balances incoming connections across every
        // worker socket bound to this port.
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(ACCEPT_BACKLOG)?;
        Ok(socket.into())
    };
    bind(addr).map_err(|source| ListenerError::Bind { addr, source })
}
