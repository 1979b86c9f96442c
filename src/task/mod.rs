// src/task/mod.rs

//! Units of work bound to a trigger path.
//!
//! There are two kinds of task:
//! - [`MoveTask`]: pre-hooks, claim, move every entry of a source directory
//!   into a target directory (with ownership/mode remediation), post-hooks,
//!   cleanup.
//! - [`CommandTask`]: claim, run commands in order, cleanup.
//!
//! Executing a task never returns `Err`; it returns a [`TaskOutcome`] that
//! says whether the task aborted (and where), or completed (and what, if
//! anything, went wrong on the way).

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::exec::{HookError, ProcessBackend, RealProcessBackend};
use crate::fs::{FileSystem, RealFileSystem};

pub mod generic;
pub mod move_task;
pub mod trigger;

pub use generic::CommandTask;
pub use move_task::{EntryKind, EntryOutcome, EntryRecord, MoveTask, SkipReason, TransferSummary};
pub use trigger::{PROCESSING_SUFFIX, Trigger, TriggerState};

/// Everything a task needs from its environment.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub fs: Arc<dyn FileSystem>,
    pub processes: Arc<dyn ProcessBackend>,
    /// Process-wide shutdown; outstanding commands are killed when it fires.
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        processes: Arc<dyn ProcessBackend>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fs,
            processes,
            cancel,
        }
    }

    /// Real filesystem and real processes.
    pub fn production(cancel: CancellationToken) -> Self {
        Self::new(Arc::new(RealFileSystem), Arc::new(RealProcessBackend), cancel)
    }
}

#[derive(Debug)]
pub enum Task {
    Move(MoveTask),
    Command(CommandTask),
}

impl Task {
    pub fn trigger(&self) -> &Trigger {
        match self {
            Task::Move(t) => &t.trigger,
            Task::Command(t) => &t.trigger,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Move(_) => "move",
            Task::Command(_) => "command",
        }
    }

    pub async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        match self {
            Task::Move(t) => t.execute(ctx).await,
            Task::Command(t) => t.execute(ctx).await,
        }
    }
}

impl From<MoveTask> for Task {
    fn from(task: MoveTask) -> Self {
        Task::Move(task)
    }
}

impl From<CommandTask> for Task {
    fn from(task: CommandTask) -> Self {
        Task::Command(task)
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("renaming trigger {path:?} to processing: {source}")]
    Claim {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading source dir {path:?}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transfer worker stopped unexpectedly: {0}")]
    Worker(String),

    #[error("removing {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where an aborted task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortStage {
    /// A pre-hook failed; the trigger was not touched.
    PreHook,
    /// The trigger could not be renamed to its processing marker.
    Claim,
    /// The move task's source directory could not be listed.
    ReadSource,
    /// The transfer worker died (panicked) mid-batch.
    Transfer,
    /// A generic task command failed; later commands did not run.
    Command,
}

impl AbortStage {
    /// True if nothing on disk had been changed when the task stopped.
    pub fn before_destructive_action(self) -> bool {
        matches!(self, AbortStage::PreHook | AbortStage::Claim)
    }
}

impl fmt::Display for AbortStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbortStage::PreHook => "pre-hook",
            AbortStage::Claim => "claim",
            AbortStage::ReadSource => "read-source",
            AbortStage::Transfer => "transfer",
            AbortStage::Command => "command",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct TaskAbort {
    pub stage: AbortStage,
    pub error: TaskError,
}

/// What a completed task did.
#[derive(Debug, Default)]
pub struct TaskReport {
    /// Per-entry results; `None` for command tasks.
    pub transfer: Option<TransferSummary>,
    /// Post-hook failure. Logged, never undoes the move.
    pub post_hook_error: Option<HookError>,
    /// Trigger/marker deletion failure after the work itself was done.
    pub cleanup_error: Option<TaskError>,
}

impl TaskReport {
    pub fn has_skipped_entries(&self) -> bool {
        self.transfer.as_ref().is_some_and(|s| s.skipped() > 0)
    }
}

#[derive(Debug)]
pub enum TaskOutcome {
    Aborted(TaskAbort),
    Completed(TaskReport),
}

impl TaskOutcome {
    pub(crate) fn aborted(stage: AbortStage, error: impl Into<TaskError>) -> Self {
        TaskOutcome::Aborted(TaskAbort {
            stage,
            error: error.into(),
        })
    }

    /// The domain action ran to the end, whatever happened to cleanup.
    pub fn domain_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    /// Completed and cleaned up. This is the strict reading of success;
    /// skipped entries and post-hook failures do not affect it.
    pub fn succeeded(&self) -> bool {
        matches!(self, TaskOutcome::Completed(r) if r.cleanup_error.is_none())
    }

    pub fn abort_stage(&self) -> Option<AbortStage> {
        match self {
            TaskOutcome::Aborted(a) => Some(a.stage),
            TaskOutcome::Completed(_) => None,
        }
    }

    pub fn report(&self) -> Option<&TaskReport> {
        match self {
            TaskOutcome::Completed(r) => Some(r),
            TaskOutcome::Aborted(_) => None,
        }
    }
}
