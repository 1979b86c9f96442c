// src/engine/stats.rs

//! Run statistics, shared between concurrently executing tasks.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::task::TaskOutcome;

#[derive(Debug, Default)]
pub struct DispatchStats {
    triggers: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    cleanup_failures: AtomicU64,
    entries_moved: AtomicU64,
    entries_skipped: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trigger(&self) {
        self.triggers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Aborted(_) => {
                self.aborted.fetch_add(1, Ordering::Relaxed);
            }
            TaskOutcome::Completed(report) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                if report.cleanup_error.is_some() {
                    self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
                }
                if let Some(summary) = &report.transfer {
                    self.entries_moved
                        .fetch_add(summary.moved() as u64, Ordering::Relaxed);
                    self.entries_skipped
                        .fetch_add(summary.skipped() as u64, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            triggers: self.triggers.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
            entries_moved: self.entries_moved.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub triggers: u64,
    pub completed: u64,
    pub aborted: u64,
    pub cleanup_failures: u64,
    pub entries_moved: u64,
    pub entries_skipped: u64,
}

impl StatsSnapshot {
    pub fn entries_total(&self) -> u64 {
        self.entries_moved + self.entries_skipped
    }

    pub fn log(&self) {
        info!(
            triggers = self.triggers,
            completed = self.completed,
            aborted = self.aborted,
            cleanup_failures = self.cleanup_failures,
            moved = self.entries_moved,
            skipped = self.entries_skipped,
            total = self.entries_total(),
            "run summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{
        AbortStage, EntryKind, EntryOutcome, EntryRecord, SkipReason, TaskError, TaskReport,
        TransferSummary,
    };
    use crate::transfer::TransferMethod;

    #[test]
    fn outcomes_are_tallied_by_kind() {
        let stats = DispatchStats::new();
        stats.record_trigger();
        stats.record_trigger();

        stats.record_outcome(&TaskOutcome::aborted(
            AbortStage::Claim,
            TaskError::Worker("gone".into()),
        ));

        let summary = TransferSummary {
            entries: vec![
                EntryRecord {
                    name: "a".into(),
                    outcome: EntryOutcome::Moved {
                        kind: EntryKind::File,
                        method: TransferMethod::Rename,
                        remediation_warnings: 0,
                    },
                },
                EntryRecord {
                    name: "b".into(),
                    outcome: EntryOutcome::Skipped(SkipReason::DestinationExists),
                },
            ],
        };
        stats.record_outcome(&TaskOutcome::Completed(TaskReport {
            transfer: Some(summary),
            ..Default::default()
        }));

        let snap = stats.snapshot();
        assert_eq!(snap.triggers, 2);
        assert_eq!(snap.aborted, 1);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.entries_moved, 1);
        assert_eq!(snap.entries_skipped, 1);
        assert_eq!(snap.entries_total(), 2);
    }
}
