// src/types.rs

use std::fmt;

use serde::Deserialize;

/// How the dispatch loop runs a task once its trigger fires.
///
/// - `Concurrent`: each trigger gets its own Tokio task; the loop keeps
///   observing events while it runs (default behaviour).
/// - `Serial`: the loop awaits the task before reading the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Concurrent,
    Serial,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Concurrent => f.write_str("concurrent"),
            DispatchMode::Serial => f.write_str("serial"),
        }
    }
}

/// Config file flavour, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}
