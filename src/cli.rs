// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `triggerd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "triggerd",
    version,
    about = "Watch for trigger files and run move or command tasks when they appear.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (YAML, or TOML when the extension is `.toml`).
    #[arg(long, value_name = "PATH", default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TRIGGERD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks and watched directories, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Run each task to completion before observing further events,
    /// regardless of `daemon.dispatch` in the config.
    #[arg(long)]
    pub serial: bool,

    /// Log a summary of triggers, tasks and transferred entries on shutdown.
    #[arg(long)]
    pub summary: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
