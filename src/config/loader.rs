// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::types::ConfigFormat;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/triggerd/config.yaml";

/// Read and deserialize a config file without semantic validation.
///
/// `.toml` files are parsed as TOML, everything else as YAML.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let format = ConfigFormat::from_path(path);
    debug!(?path, ?format, "parsing config");

    let config: RawConfigFile = match format {
        ConfigFormat::Toml => toml::from_str(&contents)?,
        ConfigFormat::Yaml => serde_yaml::from_str(&contents)?,
    };

    Ok(config)
}

/// Load a config file and validate it. This is what the daemon uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}
