// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{JobId, JobStatus};

#[derive(Error, Debug)]
pub enum TaskqError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] rusqlite::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("OS error: {0}")]
    OsError(#[from] nix::errno::Errno),

    /// Rejected at submission time; never reaches the store.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job {0} is {1}, only pending jobs can be changed")]
    JobNotPending(JobId, JobStatus),

    #[error("Job {0} is running and cannot be removed")]
    JobRunning(JobId),

    #[error("Daemon already running with pid {0}")]
    AlreadyRunning(i32),

    #[error("Daemon is not running")]
    NotRunning,

    #[error("PID file {} does not contain a pid", .0.display())]
    CorruptPidFile(PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskqError {
    /// Lifecycle errors are the ones a CLI invocation reports as a hard
    /// failure of the daemon itself rather than of a single request.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, TaskqError::AlreadyRunning(_) | TaskqError::NotRunning)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskqError>;
