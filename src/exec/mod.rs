// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] starts one command as its own process group, under an
//!   explicit uid/gid, and kills the whole group on timeout or cancellation.
//! - [`hooks`] runs an ordered list of commands, stopping at the first
//!   failure. Pre-hooks, post-hooks and generic task commands all use it.
//! - [`backend`] provides the `ProcessBackend` seam so tasks can be tested
//!   with a fake that never spawns anything.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

pub mod backend;
pub mod hooks;
pub mod runner;

pub use backend::{ProcessBackend, ProcessFuture, RealProcessBackend};
pub use hooks::{HookError, run_hooks};
pub use runner::run_command;

/// One external command invocation.
///
/// `argv[0]` is executed directly; there is no shell unless the operator
/// configured one (e.g. `["/bin/sh", "-c", "..."]`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    /// `None` runs with the daemon's own uid.
    pub uid: Option<u32>,
    /// `None` runs with the daemon's own gid.
    pub gid: Option<u32>,
    pub timeout: Option<Duration>,
    /// The complete child environment. Nothing is inherited.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_credentials(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Why a command did not complete successfully.
///
/// Callers treat every variant as "the command failed"; the variants exist so
/// the log line can say which kind of failure it was.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("command has no program to run")]
    EmptyCommand,

    #[error("spawning {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("waiting for {command:?}: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command:?} failed: {status}")]
    Exited { command: String, status: ExitStatus },

    #[error("{command:?} timed out after {timeout:?}; process group killed")]
    TimedOut { command: String, timeout: Duration },

    #[error("{command:?} cancelled by shutdown; process group killed")]
    Cancelled { command: String },
}

impl ProcessError {
    /// Short machine-friendly label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::EmptyCommand => "empty",
            ProcessError::Spawn { .. } => "spawn",
            ProcessError::Wait { .. } => "wait",
            ProcessError::Exited { .. } => "exit",
            ProcessError::TimedOut { .. } => "timeout",
            ProcessError::Cancelled { .. } => "cancelled",
        }
    }
}
