// src/engine/dispatcher.rs

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::task::{AbortStage, Task, TaskContext, TaskError, TaskOutcome};
use crate::types::DispatchMode;

use super::{DispatchEvent, DispatchExit, DispatchOptions, DispatchStats, ShutdownSignal, TaskRegistry};

/// The dispatch loop: turns trigger-created events into task executions.
///
/// In concurrent mode each matching event becomes its own Tokio task and the
/// loop goes straight back to reading events; those tasks are not awaited on
/// shutdown, but their commands are killed through the shared cancellation
/// token. In serial mode the loop awaits each task before reading on.
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    options: DispatchOptions,
    ctx: TaskContext,
    events: mpsc::Receiver<DispatchEvent>,
    signal: ShutdownSignal,
    stats: Arc<DispatchStats>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field("tasks", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        registry: Arc<TaskRegistry>,
        options: DispatchOptions,
        ctx: TaskContext,
        events: mpsc::Receiver<DispatchEvent>,
        signal: ShutdownSignal,
    ) -> Self {
        Self {
            registry,
            options,
            ctx,
            events,
            signal,
            stats: Arc::new(DispatchStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Main event loop. Returns once a stop signal fires or the event
    /// stream closes.
    pub async fn run(mut self) -> DispatchExit {
        info!(mode = %self.options.mode, tasks = self.registry.len(), "dispatch loop started");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.signal.cancelled() => break,
                event = self.events.recv() => event,
            };

            match event {
                Some(DispatchEvent::TriggerCreated(path)) => self.on_created(path).await,
                Some(DispatchEvent::WatchError(message)) => {
                    warn!(error = %message, "watcher error; continuing");
                }
                None => {
                    info!("event stream closed; exiting");
                    break;
                }
            }
        }

        let exit = self.signal.exit_reason();
        info!(?exit, "dispatch loop stopped");
        exit
    }

    async fn on_created(&self, path: PathBuf) {
        let Some(task) = self.registry.lookup(&path) else {
            debug!(path = ?path, "ignoring event for non-trigger path");
            return;
        };

        self.stats.record_trigger();
        info!(trigger = ?path, task = task.kind(), "trigger detected");

        let job = run_job(
            task,
            self.ctx.clone(),
            self.options.settle_delay,
            Arc::clone(&self.stats),
        );
        match self.options.mode {
            DispatchMode::Concurrent => {
                tokio::spawn(job);
            }
            // A graceful stop lets the running task finish; a reload drops
            // it so the process can exit right away.
            DispatchMode::Serial => tokio::select! {
                biased;
                _ = self.signal.reload_requested() => {
                    warn!(trigger = ?path, "reload requested; abandoning running task");
                }
                _ = job => {}
            },
        }
    }
}

/// Settle, execute, record. Shutdown during the settle delay leaves the
/// trigger untouched.
async fn run_job(task: Arc<Task>, ctx: TaskContext, settle: Duration, stats: Arc<DispatchStats>) {
    let trigger = task.trigger().path();

    if !settle.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(settle) => {}
            _ = ctx.cancel.cancelled() => {
                info!(trigger = ?trigger, "shutdown during settle delay; trigger left in place");
                return;
            }
        }
    }

    let outcome = task.execute(&ctx).await;
    log_outcome(&task, &outcome);
    stats.record_outcome(&outcome);
}

fn log_outcome(task: &Task, outcome: &TaskOutcome) {
    let trigger = task.trigger().path();
    match outcome {
        TaskOutcome::Aborted(abort) => match &abort.error {
            TaskError::Claim { source, .. }
                if abort.stage == AbortStage::Claim && source.kind() == io::ErrorKind::NotFound =>
            {
                info!(trigger = ?trigger, "trigger already claimed by another dispatch; nothing to do");
            }
            e if abort.stage.before_destructive_action() => {
                warn!(trigger = ?trigger, stage = %abort.stage, error = %e, "task aborted before touching any files");
            }
            e => {
                error!(trigger = ?trigger, stage = %abort.stage, error = %e, "task aborted");
            }
        },
        TaskOutcome::Completed(report) => {
            if let Some(e) = &report.cleanup_error {
                error!(trigger = ?trigger, error = %e, "task completed but trigger cleanup failed");
            } else if report.has_skipped_entries() {
                warn!(trigger = ?trigger, task = task.kind(), "task completed with skipped entries");
            } else {
                info!(trigger = ?trigger, task = task.kind(), "task completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandSpec, ProcessBackend, ProcessFuture};
    use crate::fs::RealFileSystem;
    use tokio_util::sync::CancellationToken;
    use crate::task::CommandTask;
    use std::fs;
    use std::path::Path;

    fn append_task(trigger: &Path, log: &Path) -> Task {
        Task::Command(CommandTask::new(
            trigger,
            vec![CommandSpec::new([
                "/bin/sh".to_string(),
                "-c".to_string(),
                format!("echo ran >> {}", log.display()),
            ])],
        ))
    }

    fn dispatcher(
        registry: TaskRegistry,
        mode: DispatchMode,
        settle: Duration,
    ) -> (Dispatcher, mpsc::Sender<DispatchEvent>, ShutdownSignal) {
        let (tx, rx) = mpsc::channel(16);
        let signal = ShutdownSignal::new();
        let ctx = TaskContext::production(signal.token());
        let options = DispatchOptions {
            mode,
            settle_delay: settle,
        };
        let d = Dispatcher::new(Arc::new(registry), options, ctx, rx, signal.clone());
        (d, tx, signal)
    }

    #[tokio::test]
    async fn serial_mode_runs_matching_triggers_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        let go = dir.path().join("go");
        let log = dir.path().join("log");
        fs::write(&go, b"").unwrap();

        let registry = TaskRegistry::from_tasks([append_task(&go, &log)]);
        let (d, tx, _signal) = dispatcher(registry, DispatchMode::Serial, Duration::ZERO);
        let stats = d.stats();

        tx.send(DispatchEvent::TriggerCreated(dir.path().join("unrelated")))
            .await
            .unwrap();
        tx.send(DispatchEvent::WatchError("queue overflow".into()))
            .await
            .unwrap();
        tx.send(DispatchEvent::TriggerCreated(go.clone())).await.unwrap();
        drop(tx);

        assert_eq!(d.run().await, DispatchExit::Shutdown);
        assert_eq!(fs::read_to_string(&log).unwrap(), "ran\n");
        assert!(!go.exists());
        assert!(!dir.path().join("go.processing").exists());

        let snap = stats.snapshot();
        assert_eq!(snap.triggers, 1);
        assert_eq!(snap.completed, 1);
    }

    #[tokio::test]
    async fn duplicate_events_run_the_task_once() {
        let dir = tempfile::tempdir().unwrap();
        let go = dir.path().join("go");
        let log = dir.path().join("log");
        fs::write(&go, b"").unwrap();

        let registry = TaskRegistry::from_tasks([append_task(&go, &log)]);
        let (d, tx, _signal) = dispatcher(registry, DispatchMode::Serial, Duration::ZERO);
        let stats = d.stats();

        tx.send(DispatchEvent::TriggerCreated(go.clone())).await.unwrap();
        tx.send(DispatchEvent::TriggerCreated(go.clone())).await.unwrap();
        drop(tx);
        d.run().await;

        assert_eq!(fs::read_to_string(&log).unwrap(), "ran\n");
        let snap = stats.snapshot();
        assert_eq!(snap.triggers, 2);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.aborted, 1);
    }

    #[tokio::test]
    async fn shutdown_during_settle_leaves_the_trigger_alone() {
        let dir = tempfile::tempdir().unwrap();
        let go = dir.path().join("go");
        let log = dir.path().join("log");
        fs::write(&go, b"").unwrap();

        let registry = TaskRegistry::from_tasks([append_task(&go, &log)]);
        let (d, tx, signal) = dispatcher(registry, DispatchMode::Serial, Duration::from_secs(30));
        let stats = d.stats();
        let handle = tokio::spawn(d.run());

        tx.send(DispatchEvent::TriggerCreated(go.clone())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        signal.request_shutdown();

        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, DispatchExit::Shutdown);
        assert!(go.exists());
        assert!(!log.exists());
        assert_eq!(stats.snapshot().completed, 0);
    }

    /// Ignores cancellation and never finishes on its own.
    #[derive(Debug)]
    struct StuckBackend;

    impl ProcessBackend for StuckBackend {
        fn run<'a>(&'a self, _: &'a CommandSpec, _: &'a CancellationToken) -> ProcessFuture<'a> {
            Box::pin(async {
                std::future::pending::<()>().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn reload_ends_a_serial_loop_blocked_on_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let go = dir.path().join("go");
        fs::write(&go, b"").unwrap();

        let registry = TaskRegistry::from_tasks([Task::Command(CommandTask::new(
            go.as_path(),
            vec![CommandSpec::new(["/bin/stuck"])],
        ))]);
        let (tx, rx) = mpsc::channel(16);
        let signal = ShutdownSignal::new();
        let ctx = TaskContext::new(Arc::new(RealFileSystem), Arc::new(StuckBackend), signal.token());
        let options = DispatchOptions {
            mode: DispatchMode::Serial,
            settle_delay: Duration::ZERO,
        };
        let d = Dispatcher::new(Arc::new(registry), options, ctx, rx, signal.clone());
        let handle = tokio::spawn(d.run());

        tx.send(DispatchEvent::TriggerCreated(go.clone())).await.unwrap();
        while !dir.path().join("go.processing").exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        signal.request_reload();

        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, DispatchExit::Reload);
    }

    #[tokio::test]
    async fn reload_signal_is_reported() {
        let (d, _tx, signal) =
            dispatcher(TaskRegistry::default(), DispatchMode::Concurrent, Duration::ZERO);
        signal.request_reload();
        assert_eq!(d.run().await, DispatchExit::Reload);
    }
}
