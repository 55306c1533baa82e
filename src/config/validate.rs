// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{DaemonConfig, RawConfigFile};
use crate::errors::{Result, TaskqError};

impl TryFrom<RawConfigFile> for DaemonConfig {
    type Error = crate::errors::TaskqError;

    /// Resolve against the real `$HOME` and user id.
    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from);
        let uid = nix::unistd::getuid().as_raw();
        let mut config = resolve_config(raw, home.as_deref(), uid)?;

        // The daemon changes directory to `/` when it detaches.
        let cwd = std::env::current_dir()?;
        for path in [
            &mut config.store_path,
            &mut config.log_path,
            &mut config.pid_path,
        ] {
            if path.is_relative() {
                *path = cwd.join(&*path);
            }
        }
        Ok(config)
    }
}

/// Turn a raw config into a validated one.
///
/// Unset paths default to `~/.tqd_<uid>.{db,log,pid}`; a leading `~/` in a
/// configured path is expanded against `home`.
pub fn resolve_config(raw: RawConfigFile, home: Option<&Path>, uid: u32) -> Result<DaemonConfig> {
    validate_scheduler(&raw)?;
    validate_output(&raw)?;

    let store_path = resolve_path(raw.paths.store.as_deref(), home, &format!(".tqd_{uid}.db"))?;
    let log_path = resolve_path(raw.paths.log.as_deref(), home, &format!(".tqd_{uid}.log"))?;
    let pid_path = resolve_path(raw.paths.pid_file.as_deref(), home, &format!(".tqd_{uid}.pid"))?;

    if store_path == log_path || store_path == pid_path || log_path == pid_path {
        return Err(TaskqError::ConfigError(
            "[paths] store, log and pid_file must be distinct files".to_string(),
        ));
    }

    Ok(DaemonConfig {
        store_path,
        log_path,
        pid_path,
        capacity: raw.scheduler.capacity,
        tick_interval: Duration::from_millis(raw.scheduler.tick_interval_ms),
        sweep_interval_ticks: raw.scheduler.sweep_interval_ticks,
        stdout_file: raw.output.stdout_file,
        stderr_file: raw.output.stderr_file,
    })
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.capacity == 0 {
        return Err(TaskqError::ConfigError(
            "[scheduler].capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.scheduler.tick_interval_ms == 0 {
        return Err(TaskqError::ConfigError(
            "[scheduler].tick_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_output(cfg: &RawConfigFile) -> Result<()> {
    for (key, name) in [
        ("stdout_file", &cfg.output.stdout_file),
        ("stderr_file", &cfg.output.stderr_file),
    ] {
        if name.trim().is_empty() {
            return Err(TaskqError::ConfigError(format!(
                "[output].{key} must not be empty"
            )));
        }
        if name.contains('/') || name == "." || name == ".." {
            return Err(TaskqError::ConfigError(format!(
                "[output].{key} must be a plain file name (got '{name}')"
            )));
        }
    }
    if cfg.output.stdout_file == cfg.output.stderr_file {
        return Err(TaskqError::ConfigError(
            "[output] stdout_file and stderr_file must differ".to_string(),
        ));
    }
    Ok(())
}

fn resolve_path(configured: Option<&str>, home: Option<&Path>, default_name: &str) -> Result<PathBuf> {
    let require_home = || {
        home.ok_or_else(|| {
            TaskqError::ConfigError("$HOME is not set; configure [paths] explicitly".to_string())
        })
    };

    match configured {
        None => Ok(require_home()?.join(default_name)),
        Some("~") => Ok(require_home()?.to_path_buf()),
        Some(p) => match p.strip_prefix("~/") {
            Some(rest) => Ok(require_home()?.join(rest)),
            None => Ok(PathBuf::from(p)),
        },
    }
}
