// src/engine/signals.rs

//! Process signals mapped onto cancellation tokens.
//!
//! SIGINT, SIGTERM and SIGQUIT request a graceful shutdown. SIGHUP requests a
//! reload, which the daemon implements as "cancel everything and exit 0" so
//! the supervisor restarts it with fresh configuration.

use std::io;

use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::DispatchExit;

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    shutdown: CancellationToken,
    reload: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires on any stop request. Handed to tasks so running commands die.
    pub fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn request_reload(&self) {
        self.reload.cancel();
        self.shutdown.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.shutdown.cancelled().await
    }

    /// Fires only on a reload request.
    pub async fn reload_requested(&self) {
        self.reload.cancelled().await
    }

    pub fn exit_reason(&self) -> DispatchExit {
        if self.reload.is_cancelled() {
            DispatchExit::Reload
        } else {
            DispatchExit::Shutdown
        }
    }
}

/// Install handlers and translate the first signal received.
///
/// Handler registration happens before this returns, so a signal delivered
/// right afterwards is not lost.
pub fn spawn_signal_listener(signal_state: ShutdownSignal) -> io::Result<JoinHandle<()>> {
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = term.recv() => {
                info!(signal = "SIGTERM", "shutdown requested");
                signal_state.request_shutdown();
            }
            _ = int.recv() => {
                info!(signal = "SIGINT", "shutdown requested");
                signal_state.request_shutdown();
            }
            _ = quit.recv() => {
                info!(signal = "SIGQUIT", "shutdown requested");
                signal_state.request_shutdown();
            }
            _ = hup.recv() => {
                info!(signal = "SIGHUP", "reload requested; exiting for restart");
                signal_state.request_reload();
            }
            _ = signal_state.cancelled() => {}
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_also_cancels_the_shutdown_token() {
        let s = ShutdownSignal::new();
        let token = s.token();
        assert_eq!(s.exit_reason(), DispatchExit::Shutdown);

        s.request_reload();
        assert!(token.is_cancelled());
        assert_eq!(s.exit_reason(), DispatchExit::Reload);
    }

    #[test]
    fn plain_shutdown_is_not_a_reload() {
        let s = ShutdownSignal::new();
        s.request_shutdown();
        assert!(s.is_cancelled());
        assert_eq!(s.exit_reason(), DispatchExit::Shutdown);
    }
}
