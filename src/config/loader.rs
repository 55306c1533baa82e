// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{DaemonConfig, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "TQ_CONFIG";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** resolve paths or
/// validate values. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DaemonConfig> {
    let raw = load_from_path(&path)?;
    DaemonConfig::try_from(raw)
}

/// Resolve the effective configuration for this invocation:
///
/// - an explicit `--config` path,
/// - otherwise `$TQ_CONFIG`,
/// - otherwise built-in defaults (no file required).
pub fn load_effective(explicit: Option<&Path>) -> Result<DaemonConfig> {
    match config_path(explicit) {
        Some(path) => load_and_validate(path),
        None => DaemonConfig::try_from(RawConfigFile::default()),
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}
