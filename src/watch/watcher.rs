// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::DispatchEvent;
use crate::errors::{Result, TriggerdError};
use crate::watch::filter::created_paths;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching and closes the event stream.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    dirs: Vec<PathBuf>,
}

impl WatcherHandle {
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

/// Watch every directory in `dirs` (non-recursively) and forward creation
/// events to the dispatch loop.
///
/// All watches are registered before this returns; a directory that cannot
/// be watched is a startup error. Paths are forwarded exactly as the backend
/// reports them, i.e. `<watched dir>/<name>`.
pub fn spawn_watcher(
    dirs: &BTreeSet<PathBuf>,
    dispatch_tx: mpsc::Sender<DispatchEvent>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Receiver gone means the daemon is shutting down.
            let _ = raw_tx.send(res);
        },
        Config::default(),
    )?;

    for dir in dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| TriggerdError::WatchError {
                path: dir.clone(),
                source,
            })?;
        info!(dir = ?dir, "watching");
    }

    tokio::spawn(async move {
        while let Some(res) = raw_rx.recv().await {
            let events = match res {
                Ok(event) => {
                    debug!(?event, "received notify event");
                    created_paths(&event)
                        .into_iter()
                        .map(DispatchEvent::TriggerCreated)
                        .collect()
                }
                Err(err) => vec![DispatchEvent::WatchError(err.to_string())],
            };

            for event in events {
                if dispatch_tx.send(event).await.is_err() {
                    debug!("dispatch loop gone; watcher forwarder exiting");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        dirs: dirs.iter().cloned().collect(),
    })
}
