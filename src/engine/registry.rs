// src/engine/registry.rs

//! Trigger path to task map and the derived watch set.
//!
//! Built once at startup and shared read-only afterwards.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::task::{Task, TriggerState};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    by_trigger: HashMap<PathBuf, Arc<Task>>,
    watch_set: BTreeSet<PathBuf>,
}

/// Something found on disk at startup that an operator should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFinding {
    /// `<trigger>.processing` exists: an earlier run was interrupted.
    StaleMarker { trigger: PathBuf, marker: PathBuf },
    /// The trigger already exists; it fires only once re-created.
    TriggerPresent { trigger: PathBuf },
}

impl TaskRegistry {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::from_tasks(cfg.tasks())
    }

    /// Register tasks in order. A later task with the same trigger replaces
    /// the earlier one.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut registry = Self::default();
        for task in tasks {
            let trigger = task.trigger().path().to_path_buf();
            if let Some(dir) = task.trigger().watch_dir() {
                registry.watch_set.insert(dir.to_path_buf());
            }
            if let Some(previous) = registry.by_trigger.insert(trigger.clone(), Arc::new(task)) {
                warn!(
                    trigger = ?trigger,
                    replaced = previous.kind(),
                    "duplicate trigger; the later task definition wins"
                );
            }
        }
        registry
    }

    pub fn lookup(&self, path: &Path) -> Option<Arc<Task>> {
        self.by_trigger.get(path).cloned()
    }

    pub fn watch_set(&self) -> &BTreeSet<PathBuf> {
        &self.watch_set
    }

    pub fn len(&self) -> usize {
        self.by_trigger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_trigger.is_empty()
    }

    /// Tasks sorted by trigger path.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<_> = self.by_trigger.values().cloned().collect();
        tasks.sort_by(|a, b| a.trigger().path().cmp(b.trigger().path()));
        tasks
    }

    /// Report leftovers from a previous run. Nothing is changed on disk.
    pub fn scan_startup_state(&self, fs: &dyn FileSystem) -> Vec<StartupFinding> {
        let mut findings = Vec::new();
        for task in self.tasks() {
            let trigger = task.trigger();
            let state = trigger.state(fs);

            if matches!(state, TriggerState::Processing | TriggerState::PresentWithStaleMarker) {
                warn!(
                    trigger = ?trigger.path(),
                    marker = ?trigger.marker(),
                    "stale processing marker found; a previous run was interrupted"
                );
                findings.push(StartupFinding::StaleMarker {
                    trigger: trigger.path().to_path_buf(),
                    marker: trigger.marker().to_path_buf(),
                });
            }
            if matches!(state, TriggerState::Present | TriggerState::PresentWithStaleMarker) {
                warn!(
                    trigger = ?trigger.path(),
                    "trigger already exists at startup; it will not fire until re-created"
                );
                findings.push(StartupFinding::TriggerPresent {
                    trigger: trigger.path().to_path_buf(),
                });
            }
        }
        findings
    }
}
