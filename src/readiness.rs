// src/readiness.rs

//! Service-manager readiness notification (`sd_notify` protocol).
//!
//! Sends newline-separated `KEY=VALUE` assignments as a single datagram to
//! the Unix socket named by `$NOTIFY_SOCKET`. A leading `@` selects the Linux
//! abstract namespace. Running without a service manager is not an error.

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixDatagram;

use tracing::debug;

pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Tell the service manager we are up. Returns `Ok(false)` when no
/// notification socket is configured.
pub fn notify_ready(status: &str) -> io::Result<bool> {
    let socket = std::env::var_os(NOTIFY_SOCKET_ENV);
    send_to(socket.as_deref(), &format!("READY=1\nSTATUS={status}\n"))
}

pub fn notify_stopping() -> io::Result<bool> {
    let socket = std::env::var_os(NOTIFY_SOCKET_ENV);
    send_to(socket.as_deref(), "STOPPING=1\n")
}

pub fn send_to(socket: Option<&OsStr>, message: &str) -> io::Result<bool> {
    let Some(socket) = socket.filter(|s| !s.is_empty()) else {
        debug!("{NOTIFY_SOCKET_ENV} not set; skipping readiness notification");
        return Ok(false);
    };

    let sock = UnixDatagram::unbound()?;
    match socket.as_bytes() {
        [b'@', name @ ..] => send_abstract(&sock, name, message)?,
        _ => {
            sock.send_to(message.as_bytes(), socket)?;
        }
    }
    debug!(socket = ?socket, message, "sent service notification");
    Ok(true)
}

#[cfg(target_os = "linux")]
fn send_abstract(sock: &UnixDatagram, name: &[u8], message: &str) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name)?;
    sock.send_to_addr(message.as_bytes(), &addr)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn send_abstract(_sock: &UnixDatagram, _name: &[u8], _message: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract notification sockets are Linux-only",
    ))
}
