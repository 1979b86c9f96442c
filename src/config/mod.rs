// src/config/mod.rs

//! Configuration loading and validation for triggerd.
//!
//! - `model.rs`: the serde data model (YAML or TOML on disk).
//! - `loader.rs`: read a file and pick the format from its extension.
//! - `validate.rs`: path and command sanity checks (`RawConfigFile` to `ConfigFile`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_PATH, load_and_validate, load_from_path};
pub use model::{
    CommandConfig, CommandLine, ConfigFile, DaemonSection, GenericTaskConfig, MoveTaskConfig,
    RawConfigFile,
};
