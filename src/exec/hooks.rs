// src/exec/hooks.rs

//! Sequential command lists (pre/post hooks, generic task commands).

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{CommandSpec, ProcessBackend, ProcessError};

/// The first command in a sequence that failed.
#[derive(Error, Debug)]
#[error("{tag} command #{index} ({command}) failed: {source}")]
pub struct HookError {
    pub tag: String,
    pub index: usize,
    pub command: String,
    #[source]
    pub source: ProcessError,
}

/// Run `commands` one after another, stopping at the first failure.
///
/// `tag` names the sequence in logs and errors ("pre", "post", "run"). What a
/// failure means is up to the caller: pre-hooks abort their task, post-hooks
/// are only logged.
pub async fn run_hooks(
    backend: &dyn ProcessBackend,
    tag: &str,
    commands: &[CommandSpec],
    cancel: &CancellationToken,
) -> Result<(), HookError> {
    for (index, command) in commands.iter().enumerate() {
        info!(hook = tag, index, command = %command, "running command");

        if let Err(source) = backend.run(command, cancel).await {
            warn!(
                hook = tag,
                index,
                command = %command,
                failure = source.kind(),
                error = %source,
                "command failed; skipping the rest of the sequence"
            );
            return Err(HookError {
                tag: tag.to_string(),
                index,
                command: command.to_string(),
                source,
            });
        }
    }
    Ok(())
}
