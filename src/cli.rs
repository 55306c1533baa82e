// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use crate::errors::{Result as TaskqResult, TaskqError};
use crate::types::JobId;

/// Command-line arguments for `tq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tq",
    version,
    about = "Queue shell commands and run them in the background under a shared weight budget.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `TQ_CONFIG` or the built-in defaults are used.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TQ_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the background daemon.
    Start {
        /// Stay in the foreground and log to stderr.
        #[arg(long)]
        foreground: bool,
    },

    /// Stop the background daemon.
    Stop,

    /// Show whether the daemon runs and how the queue looks.
    Status,

    /// Queue a command to run in the current directory.
    ///
    /// Example: `tq submit 5 2 -- make -j2 test`
    #[command(allow_negative_numbers = true)]
    Submit {
        /// Higher runs first (default 0).
        #[arg(value_name = "PRIORITY")]
        priority: Option<i64>,

        /// Share of the capacity the job occupies, 1..=10 (default 10).
        #[arg(value_name = "WEIGHT")]
        weight: Option<u32>,

        /// Program and arguments. Each argument is passed through unchanged;
        /// use `sh -c '...'` for pipes and other shell syntax.
        #[arg(last = true, required = true, value_name = "CMD")]
        command: Vec<String>,
    },

    /// List all jobs.
    List,

    /// Remove a job that is not running.
    Remove {
        #[arg(value_name = "ID")]
        id: JobId,
    },

    /// Change priority and/or weight of a pending job.
    ///
    /// Example: `tq edit 7 priority=3 weight=5`
    Edit {
        #[arg(value_name = "ID")]
        id: JobId,

        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<Assignment>,
    },

    /// Delete finished and orphaned jobs.
    Clean,

    /// Like `clean`; with the daemon stopped, also delete the store and log.
    Purge,
}

/// A `field=value` argument of `tq edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Priority(i64),
    Weight(u32),
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
        let value = value.trim();
        match field.trim() {
            "priority" => value
                .parse()
                .map(Assignment::Priority)
                .map_err(|e| format!("invalid priority '{value}': {e}")),
            "weight" => value
                .parse()
                .map(Assignment::Weight)
                .map_err(|e| format!("invalid weight '{value}': {e}")),
            other => Err(format!(
                "unknown field '{other}' (expected 'priority' or 'weight')"
            )),
        }
    }
}

/// Collapse `edit` assignments into `(priority, weight)`; later ones win.
pub fn fold_assignments(assignments: &[Assignment]) -> (Option<i64>, Option<u32>) {
    assignments
        .iter()
        .fold((None, None), |(priority, weight), a| match *a {
            Assignment::Priority(p) => (Some(p), weight),
            Assignment::Weight(w) => (priority, Some(w)),
        })
}

/// Quote `argv` into the single command line stored with the job.
///
/// The line is later run with `sh -c`, which must split it back into exactly
/// these arguments.
pub fn join_command(argv: &[String]) -> TaskqResult<String> {
    shlex::try_join(argv.iter().map(String::as_str))
        .map_err(|e| TaskqError::InvalidJob(format!("cannot quote command: {e}")))
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
