// src/types.rs

//! Job records and the constants shared by the store, scheduler and workers.

use std::fmt;
use std::path::PathBuf;

/// Identifier of a job row. Assigned by the store, never reused.
pub type JobId = i64;

/// Default total scheduling capacity shared by all running jobs.
pub const DEFAULT_CAPACITY: u32 = 10;

/// Largest weight a job may declare.
pub const MAX_WEIGHT: u32 = 10;

/// Smallest weight a job may declare.
pub const MIN_WEIGHT: u32 = 1;

/// Weight used when a submitter does not specify one (exclusive use).
pub const DEFAULT_WEIGHT: u32 = 10;

/// Priority used when a submitter does not specify one.
pub const DEFAULT_PRIORITY: i64 = 0;

/// Value stored in `worker_pid` for rows whose worker vanished without
/// reporting an outcome. Only the store layer looks at it directly.
pub const ORPHAN_PID: i64 = -1;

/// Exit code recorded when the command could not be spawned at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Lifecycle state of a job, derived from its stored columns.
///
/// - `Pending`: no worker, no exit code.
/// - `Running`: claimed by a live (or not yet swept) worker process.
/// - `Finished`: an exit code was recorded.
/// - `Orphaned`: the worker disappeared before recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Orphaned,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Finished,
        JobStatus::Orphaned,
    ];

    /// Classify a row from its raw `worker_pid` / `exit_code` columns.
    pub fn from_columns(worker_pid: Option<i64>, exit_code: Option<i32>) -> Self {
        match (worker_pid, exit_code) {
            (_, Some(_)) => JobStatus::Finished,
            (None, None) => JobStatus::Pending,
            (Some(pid), None) if pid == ORPHAN_PID => JobStatus::Orphaned,
            (Some(_), None) => JobStatus::Running,
        }
    }

    /// Terminal rows are the ones `clean`/`purge` may discard.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Orphaned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted job row.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// Worker process currently executing the job; `ORPHAN_PID` marks an
    /// orphan.
    pub worker_pid: Option<i64>,
    pub working_directory: PathBuf,
    pub command: String,
    pub exit_code: Option<i32>,
    /// Seconds since the epoch.
    pub start_time: Option<f64>,
    /// Seconds since the epoch.
    pub end_time: Option<f64>,
    pub priority: i64,
    pub weight: u32,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        JobStatus::from_columns(self.worker_pid, self.exit_code)
    }

    /// Pid of the live worker, if the job is running.
    pub fn running_pid(&self) -> Option<i64> {
        match self.status() {
            JobStatus::Running => self.worker_pid,
            _ => None,
        }
    }

    /// Wall-clock run time, once both timestamps are known.
    pub fn elapsed(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// A job as submitted, before the store assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub working_directory: PathBuf,
    pub command: String,
    pub priority: i64,
    pub weight: u32,
}

impl NewJob {
    pub fn new(working_directory: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            command: command.into(),
            priority: DEFAULT_PRIORITY,
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Current wall-clock time as floating-point seconds since the epoch.
pub fn now_epoch_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
