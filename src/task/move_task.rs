// src/task/move_task.rs

//! Batch move of a source directory's entries into a target directory.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::exec::{CommandSpec, run_hooks};
use crate::fs::FileSystem;
use crate::perms::{PermissionSpec, Remediator};
use crate::transfer::{self, TransferError, TransferMethod};

use super::{AbortStage, TaskContext, TaskError, TaskOutcome, TaskReport, Trigger};

#[derive(Debug, Clone)]
pub struct MoveTask {
    pub trigger: Trigger,
    pub source: PathBuf,
    pub target: PathBuf,
    pub permissions: PermissionSpec,
    pub overwrite: bool,
    pub pre: Vec<CommandSpec>,
    pub post: Vec<CommandSpec>,
}

/// What kind of entry was found in the source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

#[derive(Debug)]
pub enum SkipReason {
    /// Destination exists and overwrite is off.
    DestinationExists,
    /// Destination is the source entry itself (source and target coincide).
    SameEntry,
    /// Destination exists, overwrite is on, but removing it failed.
    ClearDestination(io::Error),
    /// The entry could not be inspected (e.g. it vanished mid-batch).
    Unreadable(io::Error),
    Transfer(TransferError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DestinationExists => f.write_str("destination exists"),
            SkipReason::SameEntry => f.write_str("destination is the source entry"),
            SkipReason::ClearDestination(e) => write!(f, "removing existing destination: {e}"),
            SkipReason::Unreadable(e) => write!(f, "inspecting source entry: {e}"),
            SkipReason::Transfer(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug)]
pub enum EntryOutcome {
    Moved {
        kind: EntryKind,
        method: TransferMethod,
        remediation_warnings: usize,
    },
    Skipped(SkipReason),
}

#[derive(Debug)]
pub struct EntryRecord {
    pub name: OsString,
    pub outcome: EntryOutcome,
}

/// Per-entry results of one batch. Trigger and marker entries never appear.
#[derive(Debug, Default)]
pub struct TransferSummary {
    pub entries: Vec<EntryRecord>,
}

impl TransferSummary {
    pub fn moved(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Moved { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.total() - self.moved()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn outcome_of(&self, name: &str) -> Option<&EntryOutcome> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moved={} skipped={} total={}",
            self.moved(),
            self.skipped(),
            self.total()
        )
    }
}

impl MoveTask {
    pub async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        let trigger = self.trigger.path();

        if !self.pre.is_empty() {
            if let Err(e) = run_hooks(ctx.processes.as_ref(), "pre", &self.pre, &ctx.cancel).await {
                error!(trigger = ?trigger, error = %e, "pre-hook failed; task aborted");
                return TaskOutcome::aborted(AbortStage::PreHook, e);
            }
        }

        if let Err(source) = self.trigger.claim(ctx.fs.as_ref()) {
            return TaskOutcome::aborted(
                AbortStage::Claim,
                TaskError::Claim {
                    path: trigger.to_path_buf(),
                    source,
                },
            );
        }

        let batch = {
            let task = self.clone();
            let fs = ctx.fs.clone();
            tokio::task::spawn_blocking(move || task.transfer_batch(fs.as_ref())).await
        };
        let summary = match batch {
            Ok(Ok(summary)) => summary,
            Ok(Err(source)) => {
                return TaskOutcome::aborted(
                    AbortStage::ReadSource,
                    TaskError::ReadSource {
                        path: self.source.clone(),
                        source,
                    },
                );
            }
            Err(join) => {
                return TaskOutcome::aborted(AbortStage::Transfer, TaskError::Worker(join.to_string()));
            }
        };

        info!(trigger = ?trigger, source = ?self.source, target = ?self.target, %summary, "batch finished");

        let mut report = TaskReport::default();

        if !self.post.is_empty() {
            if let Err(e) = run_hooks(ctx.processes.as_ref(), "post", &self.post, &ctx.cancel).await {
                warn!(trigger = ?trigger, error = %e, "post-hook failed; moved files stay in place");
                report.post_hook_error = Some(e);
            }
        }

        if let Err((path, source)) = self.trigger.release(ctx.fs.as_ref()) {
            error!(trigger = ?trigger, path = ?path, error = %source, "files moved but cleanup failed");
            report.cleanup_error = Some(TaskError::Cleanup { path, source });
        }

        report.transfer = Some(summary);
        TaskOutcome::Completed(report)
    }

    /// Move every eligible entry of `source`. Only listing `source` can fail;
    /// per-entry problems are recorded and the batch carries on.
    pub fn transfer_batch(&self, fs: &dyn FileSystem) -> io::Result<TransferSummary> {
        let (remediator, warnings) = Remediator::resolve(&self.permissions);
        for w in &warnings {
            warn!(trigger = ?self.trigger.path(), warning = %w, "permission setting ignored");
        }

        let mut summary = TransferSummary::default();

        for src in fs.read_dir(&self.source)? {
            let Some(name) = src.file_name().map(|n| n.to_os_string()) else {
                continue;
            };
            if self.trigger.is_self_reference(&name) {
                debug!(entry = ?src, "skipping trigger entry");
                continue;
            }

            let dest = self.target.join(&name);
            let outcome = self.transfer_entry(fs, &remediator, &src, &dest);
            summary.entries.push(EntryRecord { name, outcome });
        }

        Ok(summary)
    }

    fn transfer_entry(
        &self,
        fs: &dyn FileSystem,
        remediator: &Remediator,
        src: &Path,
        dest: &Path,
    ) -> EntryOutcome {
        let src_meta = match fs.symlink_metadata(src) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(entry = ?src, error = %e, "skipping unreadable entry");
                return EntryOutcome::Skipped(SkipReason::Unreadable(e));
            }
        };
        let kind = if src_meta.file_type().is_symlink() {
            EntryKind::Symlink
        } else if src_meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };

        if let Ok(dest_meta) = fs.symlink_metadata(dest) {
            if dest_meta.dev() == src_meta.dev() && dest_meta.ino() == src_meta.ino() {
                warn!(entry = ?src, destination = ?dest, "skipping: destination is the source entry");
                return EntryOutcome::Skipped(SkipReason::SameEntry);
            }
        }

        if fs.entry_exists(dest) {
            if !self.overwrite {
                info!(entry = ?src, destination = ?dest, "skipping: destination exists");
                return EntryOutcome::Skipped(SkipReason::DestinationExists);
            }
            if let Err(e) = fs.remove_entry(dest) {
                warn!(destination = ?dest, error = %e, "failed to remove existing destination; skipping");
                return EntryOutcome::Skipped(SkipReason::ClearDestination(e));
            }
        }

        let method = match transfer::move_entry(fs, src, dest) {
            Ok(method) => method,
            Err(e) => {
                warn!(entry = ?src, destination = ?dest, error = %e, "failed to move entry; skipping");
                return EntryOutcome::Skipped(SkipReason::Transfer(e));
            }
        };
        info!(from = ?src, to = ?dest, ?method, "moved");

        let warnings = match kind {
            EntryKind::Dir => remediator.apply_tree(dest),
            EntryKind::File => remediator.apply(dest, false),
            EntryKind::Symlink => remediator.apply_link(dest),
        };
        for w in &warnings {
            warn!(path = ?dest, warning = %w, "permission remediation incomplete");
        }

        EntryOutcome::Moved {
            kind,
            method,
            remediation_warnings: warnings.len(),
        }
    }
}
