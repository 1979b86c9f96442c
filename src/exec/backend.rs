// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! Tasks talk to a `ProcessBackend` instead of spawning processes directly.
//! Production code uses [`RealProcessBackend`], which forwards to
//! [`run_command`](super::runner::run_command). Tests provide their own
//! implementation that records what would have run and fails on demand.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use super::runner::run_command;
use super::{CommandSpec, ProcessError};

pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProcessError>> + Send + 'a>>;

/// Trait abstracting how a single command is executed.
pub trait ProcessBackend: Send + Sync + Debug {
    /// Run `command` to completion, honouring `cancel`.
    fn run<'a>(&'a self, command: &'a CommandSpec, cancel: &'a CancellationToken) -> ProcessFuture<'a>;
}

/// Real process backend used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessBackend;

impl ProcessBackend for RealProcessBackend {
    fn run<'a>(&'a self, command: &'a CommandSpec, cancel: &'a CancellationToken) -> ProcessFuture<'a> {
        Box::pin(run_command(command, cancel))
    }
}
