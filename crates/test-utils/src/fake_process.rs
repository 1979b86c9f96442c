use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use triggerd::exec::{CommandSpec, ProcessBackend, ProcessError, ProcessFuture};

/// A fake process backend that:
/// - records the command line of every command it was asked to run
/// - fails (exit status 1) for commands registered with [`fail_on`]
/// - optionally sleeps per command, honouring cancellation
///
/// [`fail_on`]: RecordingBackend::fail_on
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose joined argv equals `command` exit non-zero.
    pub fn fail_on(self, command: &str) -> Self {
        self.failing.lock().unwrap().push(command.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every command started so far, in order, as `argv.join(" ")`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessBackend for RecordingBackend {
    fn run<'a>(&'a self, command: &'a CommandSpec, cancel: &'a CancellationToken) -> ProcessFuture<'a> {
        Box::pin(async move {
            let line = command.to_string();
            self.calls.lock().unwrap().push(line.clone());

            if let Some(delay) = self.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return Err(ProcessError::Cancelled { command: line });
                    }
                }
            }

            if self.failing.lock().unwrap().contains(&line) {
                return Err(ProcessError::Exited {
                    command: line,
                    status: ExitStatus::from_raw(1 << 8),
                });
            }
            Ok(())
        })
    }
}
