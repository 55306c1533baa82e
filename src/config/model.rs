// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::OutputSinks;
use crate::sched::SchedulerOptions;
use crate::types::DEFAULT_CAPACITY;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// store = "~/.tqd.db"
/// log = "~/.tqd.log"
/// pid_file = "~/.tqd.pid"
///
/// [scheduler]
/// capacity = 10
/// tick_interval_ms = 1000
/// sweep_interval_ticks = 10
///
/// [output]
/// stdout_file = "tq.out"
/// stderr_file = "tq.err"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub output: OutputSection,
}

/// `[paths]` section. Unset paths fall back to per-user files in `$HOME`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default)]
    pub store: Option<String>,

    /// Daemon log (the daemon's redirected stdout/stderr).
    #[serde(default)]
    pub log: Option<String>,

    #[serde(default)]
    pub pid_file: Option<String>,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    /// Total weight budget shared by running jobs.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Liveness sweep period in ticks; 0 sweeps only at startup.
    #[serde(default = "default_sweep_interval_ticks")]
    pub sweep_interval_ticks: u64,
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_sweep_interval_ticks() -> u64 {
    10
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            tick_interval_ms: default_tick_interval_ms(),
            sweep_interval_ticks: default_sweep_interval_ticks(),
        }
    }
}

/// `[output]` section: names of the per-working-directory sinks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_stdout_file")]
    pub stdout_file: String,

    #[serde(default = "default_stderr_file")]
    pub stderr_file: String,
}

fn default_stdout_file() -> String {
    "tq.out".to_string()
}

fn default_stderr_file() -> String {
    "tq.err".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            stdout_file: default_stdout_file(),
            stderr_file: default_stderr_file(),
        }
    }
}

/// Validated configuration handed to the daemon and client operations.
///
/// Constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), or
/// [`DaemonConfig::in_dir`] for self-contained setups such as tests.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub pid_path: PathBuf,
    pub capacity: u32,
    pub tick_interval: Duration,
    pub sweep_interval_ticks: u64,
    pub stdout_file: String,
    pub stderr_file: String,
}

impl DaemonConfig {
    /// Default settings with all state files under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let scheduler = SchedulerSection::default();
        let output = OutputSection::default();
        Self {
            store_path: dir.join("tqd.db"),
            log_path: dir.join("tqd.log"),
            pid_path: dir.join("tqd.pid"),
            capacity: scheduler.capacity,
            tick_interval: Duration::from_millis(scheduler.tick_interval_ms),
            sweep_interval_ticks: scheduler.sweep_interval_ticks,
            stdout_file: output.stdout_file,
            stderr_file: output.stderr_file,
        }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            capacity: self.capacity,
            tick_interval: self.tick_interval,
            sweep_interval_ticks: self.sweep_interval_ticks,
        }
    }

    pub fn output_sinks(&self) -> OutputSinks {
        OutputSinks::new(&self.stdout_file, &self.stderr_file)
    }
}
