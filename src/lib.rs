// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod perms;
pub mod readiness;
pub mod task;
pub mod transfer;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::{
    DispatchEvent, DispatchExit, DispatchOptions, Dispatcher, ShutdownSignal, StatsSnapshot,
    TaskRegistry, spawn_signal_listener,
};
use crate::task::{Task, TaskContext};
use crate::types::DispatchMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registry and startup scan
/// - signal handling
/// - file watcher
/// - readiness notification
/// - the dispatch loop
pub async fn run(args: CliArgs) -> Result<DispatchExit> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {config_path:?}"))?;

    let mut options = DispatchOptions::from(&cfg.daemon);
    if args.serial {
        options.mode = DispatchMode::Serial;
    }

    if args.dry_run {
        print_dry_run(&cfg, &options);
        return Ok(DispatchExit::Shutdown);
    }

    let signal = ShutdownSignal::new();
    let _signals = spawn_signal_listener(signal.clone()).context("installing signal handlers")?;

    let (exit, stats) = serve(&cfg, options, signal).await?;
    if args.summary {
        stats.log();
    }
    Ok(exit)
}

/// Run the daemon for an already validated config until `signal` fires.
///
/// Fatal startup errors (a directory that cannot be watched) are returned
/// before any event is dispatched.
pub async fn serve(
    cfg: &ConfigFile,
    options: DispatchOptions,
    signal: ShutdownSignal,
) -> Result<(DispatchExit, StatsSnapshot)> {
    let registry = Arc::new(TaskRegistry::from_config(cfg));
    let ctx = TaskContext::production(signal.token());

    let findings = registry.scan_startup_state(ctx.fs.as_ref());
    debug!(count = findings.len(), "startup scan finished");

    let (tx, rx) = mpsc::channel::<DispatchEvent>(256);
    let watcher = watch::spawn_watcher(registry.watch_set(), tx)?;

    let status = format!(
        "watching {} directories for {} triggers",
        watcher.watched_dirs().len(),
        registry.len()
    );
    match readiness::notify_ready(&status) {
        Ok(_) => info!(status, "ready"),
        Err(e) => warn!(error = %e, "readiness notification failed"),
    }

    let dispatcher = Dispatcher::new(registry, options, ctx, rx, signal);
    let stats = dispatcher.stats();
    let exit = dispatcher.run().await;

    if let Err(e) = readiness::notify_stopping() {
        debug!(error = %e, "stopping notification failed");
    }
    drop(watcher);

    Ok((exit, stats.snapshot()))
}

/// Print the resolved configuration without touching anything.
fn print_dry_run(cfg: &ConfigFile, options: &DispatchOptions) {
    let registry = TaskRegistry::from_config(cfg);

    println!("triggerd dry-run");
    println!("  daemon.dispatch = {}", options.mode);
    println!("  daemon.settle_delay = {:?}", options.settle_delay);
    println!();

    println!("tasks ({}):", registry.len());
    for task in registry.tasks() {
        println!("  - {} ({})", task.trigger().path().display(), task.kind());
        match task.as_ref() {
            Task::Move(t) => {
                println!("      source: {}", t.source.display());
                println!("      target: {}", t.target.display());
                println!("      overwrite: {}", t.overwrite);
                if !t.permissions.is_empty() {
                    println!("      permissions: {:?}", t.permissions);
                }
                for (tag, hooks) in [("pre", &t.pre), ("post", &t.post)] {
                    for cmd in hooks.iter() {
                        println!("      {tag}: {cmd}");
                    }
                }
            }
            Task::Command(t) => {
                for cmd in &t.commands {
                    println!("      run: {cmd}");
                }
            }
        }
    }
    println!();

    println!("watch set ({}):", registry.watch_set().len());
    for dir in registry.watch_set() {
        println!("  - {}", dir.display());
    }

    debug!("dry-run complete (no execution)");
}
