// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Errors here are the "fatal at startup" class: anything that prevents the
//! dispatch loop from being entered. Task-level failures have their own
//! types in [`crate::task`], [`crate::exec`] and [`crate::transfer`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriggerdError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to watch directory {path:?}: {source}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, TriggerdError>;
