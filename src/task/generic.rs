// src/task/generic.rs

use tracing::{error, info};

use crate::exec::{CommandSpec, run_hooks};

use super::{AbortStage, TaskContext, TaskError, TaskOutcome, TaskReport, Trigger};

/// Claim the trigger, run commands in order, clean up.
#[derive(Debug, Clone)]
pub struct CommandTask {
    pub trigger: Trigger,
    pub commands: Vec<CommandSpec>,
}

impl CommandTask {
    pub fn new(trigger: impl Into<Trigger>, commands: Vec<CommandSpec>) -> Self {
        Self {
            trigger: trigger.into(),
            commands,
        }
    }

    pub async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
        let trigger = self.trigger.path();

        if let Err(source) = self.trigger.claim(ctx.fs.as_ref()) {
            return TaskOutcome::aborted(
                AbortStage::Claim,
                TaskError::Claim {
                    path: trigger.to_path_buf(),
                    source,
                },
            );
        }

        // The marker stays behind on failure so the interrupted run is visible.
        if let Err(e) = run_hooks(ctx.processes.as_ref(), "run", &self.commands, &ctx.cancel).await {
            return TaskOutcome::aborted(AbortStage::Command, e);
        }

        let cleanup_error = self.trigger.release(ctx.fs.as_ref()).err().map(|(path, source)| {
            error!(trigger = ?trigger, path = ?path, error = %source, "commands finished but cleanup failed");
            TaskError::Cleanup { path, source }
        });

        info!(trigger = ?trigger, commands = self.commands.len(), "command task finished");

        TaskOutcome::Completed(TaskReport {
            cleanup_error,
            ..Default::default()
        })
    }
}
