// src/engine/mod.rs

//! Dispatch engine for triggerd.
//!
//! This module ties together:
//! - the task registry (trigger path to task, plus the watch set)
//! - the dispatch loop that reacts to:
//!   - trigger-created events from the watcher
//!   - watcher errors
//!   - shutdown and reload signals
//! - run statistics

use std::path::PathBuf;
use std::time::Duration;

use crate::config::DaemonSection;
use crate::types::DispatchMode;

pub mod dispatcher;
pub mod registry;
pub mod signals;
pub mod stats;

pub use dispatcher::Dispatcher;
pub use registry::{StartupFinding, TaskRegistry};
pub use signals::{ShutdownSignal, spawn_signal_listener};
pub use stats::{DispatchStats, StatsSnapshot};

/// Events flowing into the dispatch loop from the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Something was created (or renamed into place) at this path.
    TriggerCreated(PathBuf),
    /// The watcher reported an error. Logged; the loop keeps going.
    WatchError(String),
}

/// Why the dispatch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// SIGINT/SIGTERM/SIGQUIT, or the event stream ended.
    Shutdown,
    /// SIGHUP: exit so the supervisor restarts with fresh configuration.
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub mode: DispatchMode,
    pub settle_delay: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&DaemonSection::default())
    }
}

impl From<&DaemonSection> for DispatchOptions {
    fn from(daemon: &DaemonSection) -> Self {
        Self {
            mode: daemon.dispatch,
            settle_delay: daemon.settle_delay(),
        }
    }
}
