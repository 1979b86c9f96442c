// src/exec/runner.rs

//! Individual command runner.

use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CommandSpec, ProcessError};

/// Run one command to completion.
///
/// The child becomes the leader of a new process group, gets an empty
/// environment (plus `spec.env`), no stdin, and the daemon's stdout/stderr.
/// If `cancel` fires or `spec.timeout` elapses first, SIGKILL is sent to the
/// whole group so that anything the command forked dies with it.
pub async fn run_command(
    spec: &CommandSpec,
    cancel: &CancellationToken,
) -> Result<(), ProcessError> {
    let command = spec.to_string();
    let (program, args) = spec.argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .process_group(0);

    match (spec.uid, spec.gid) {
        (None, None) => debug!(command = %command, "no uid/gid configured; inheriting daemon credentials"),
        (uid, gid) => {
            if let Some(gid) = gid {
                cmd.gid(gid);
            }
            if let Some(uid) = uid {
                cmd.uid(uid);
            }
        }
    }

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: command.clone(),
        source,
    })?;

    let mut group = ProcessGroup::of(&child);
    info!(command = %command, pgid = ?group.pgid, timeout = ?spec.timeout, "command started");

    tokio::select! {
        status = child.wait() => {
            group.mark_finished();
            let status = status.map_err(|source| ProcessError::Wait {
                command: command.clone(),
                source,
            })?;

            if status.success() {
                debug!(command = %command, "command exited successfully");
                Ok(())
            } else {
                warn!(command = %command, %status, "command exited unsuccessfully");
                Err(ProcessError::Exited { command, status })
            }
        }

        _ = cancel.cancelled() => {
            warn!(command = %command, "shutdown requested; killing process group");
            group.kill();
            reap(&mut child, &command).await;
            Err(ProcessError::Cancelled { command })
        }

        _ = deadline(spec.timeout) => {
            let timeout = spec.timeout.unwrap_or_default();
            warn!(command = %command, ?timeout, "command timed out; killing process group");
            group.kill();
            reap(&mut child, &command).await;
            Err(ProcessError::TimedOut { command, timeout })
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

async fn reap(child: &mut Child, command: &str) {
    if let Err(e) = child.wait().await {
        debug!(command = %command, error = %e, "failed to reap killed command");
    }
}

/// The process group a spawned command leads.
///
/// `finished` is set once the leader has been waited on; after that the
/// group is never signalled, so a recycled pgid cannot be hit. Dropping an
/// unfinished group (e.g. the runner future itself was dropped) kills it.
#[derive(Debug)]
struct ProcessGroup {
    pgid: Option<Pid>,
    finished: bool,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        let pgid = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .map(Pid::from_raw);
        Self {
            pgid,
            finished: false,
        }
    }

    fn mark_finished(&mut self) {
        self.finished = true;
    }

    fn kill(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let Some(pgid) = self.pgid else {
            return;
        };
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => debug!(?pgid, "process group killed"),
            Err(e) => warn!(?pgid, error = %e, "failed to kill process group"),
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
