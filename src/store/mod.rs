// src/store/mod.rs

//! Durable job table shared by every `tq` process.
//!
//! The scheduler, the workers and short-lived client invocations never talk
//! to each other directly; all coordination goes through a [`JobStore`].
//!
//! - [`sqlite`] is the production backend (one SQLite file on local disk).
//! - [`memory`] keeps rows in a mutex-guarded map and is used by tests.
//!
//! Every state transition is a single-row update guarded by a
//! [`Precondition`], which is enough for the single-writer discipline the
//! scheduler follows: only the scheduler claims pending rows, only a worker
//! (or the liveness sweep, for already-claimed rows) releases them.

pub mod memory;
pub mod sqlite;

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Context;

use crate::errors::Result;
use crate::types::{Job, JobId, JobStatus, NewJob};

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

/// Row predicate for queries and bulk deletes.
///
/// An empty status list matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub statuses: Vec<JobStatus>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(status: JobStatus) -> Self {
        Self {
            statuses: vec![status],
        }
    }

    pub fn terminal() -> Self {
        Self {
            statuses: JobStatus::ALL
                .into_iter()
                .filter(|s| s.is_terminal())
                .collect(),
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&job.status())
    }
}

/// Result ordering for [`JobStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobOrder {
    /// Ascending id (submission order).
    #[default]
    Id,
    /// Highest priority first, oldest submission first within a priority.
    Admission,
}

/// Guard evaluated atomically together with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    #[default]
    Always,
    /// Row has neither a worker nor an exit code.
    Pending,
    /// Row has no exit code yet (pending, running or orphaned).
    Unfinished,
    /// Row is unfinished and `worker_pid` equals the given pid.
    ClaimedBy(i64),
    /// Row is anything but running (pending, finished or orphaned).
    NotRunning,
}

impl Precondition {
    pub fn holds_for(&self, job: &Job) -> bool {
        match *self {
            Precondition::Always => true,
            Precondition::Pending => job.status() == JobStatus::Pending,
            Precondition::Unfinished => job.exit_code.is_none(),
            Precondition::ClaimedBy(pid) => {
                job.exit_code.is_none() && job.worker_pid == Some(pid)
            }
            Precondition::NotRunning => job.status() != JobStatus::Running,
        }
    }
}

/// Field-level partial update. `None` leaves a column untouched; nullable
/// columns use a nested `Option` so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub worker_pid: Option<Option<i64>>,
    pub exit_code: Option<Option<i32>>,
    pub start_time: Option<Option<f64>>,
    pub end_time: Option<Option<f64>>,
    pub priority: Option<i64>,
    pub weight: Option<u32>,
    pub precondition: Precondition,
}

impl JobUpdate {
    /// pending -> running: record the claiming pid and start time.
    pub fn claim(pid: i64, start_time: f64) -> Self {
        Self {
            worker_pid: Some(Some(pid)),
            start_time: Some(Some(start_time)),
            precondition: Precondition::Pending,
            ..Self::default()
        }
    }

    /// Hand a claimed row over from `from_pid` to the spawned child.
    pub fn reassign(from_pid: i64, to_pid: i64) -> Self {
        Self {
            worker_pid: Some(Some(to_pid)),
            precondition: Precondition::ClaimedBy(from_pid),
            ..Self::default()
        }
    }

    /// running -> finished: exit code, end time and a cleared worker pid in
    /// one write.
    pub fn finish(exit_code: i32, end_time: f64) -> Self {
        Self {
            worker_pid: Some(None),
            exit_code: Some(Some(exit_code)),
            end_time: Some(Some(end_time)),
            precondition: Precondition::Unfinished,
            ..Self::default()
        }
    }

    /// running -> orphaned, only if the row still names `observed_pid`.
    pub fn orphan(observed_pid: i64) -> Self {
        Self {
            worker_pid: Some(Some(crate::types::ORPHAN_PID)),
            precondition: Precondition::ClaimedBy(observed_pid),
            ..Self::default()
        }
    }

    /// Operator edit of scheduling metadata on a pending row.
    pub fn scheduling(priority: Option<i64>, weight: Option<u32>) -> Self {
        Self {
            priority,
            weight,
            precondition: Precondition::Pending,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.worker_pid.is_none()
            && self.exit_code.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.priority.is_none()
            && self.weight.is_none()
    }

    /// Apply the field changes to an in-memory row (precondition not checked).
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(pid) = self.worker_pid {
            job.worker_pid = pid;
        }
        if let Some(code) = self.exit_code {
            job.exit_code = code;
        }
        if let Some(t) = self.start_time {
            job.start_time = t;
        }
        if let Some(t) = self.end_time {
            job.end_time = t;
        }
        if let Some(p) = self.priority {
            job.priority = p;
        }
        if let Some(w) = self.weight {
            job.weight = w;
        }
    }
}

/// Storage backend for job rows.
///
/// Implementations must make every successful write durable before
/// returning, and must derive new ids from durable content so that an id is
/// never handed out twice for the same store, across restarts included.
pub trait JobStore: Send + Sync + Debug {
    /// Insert a pending row and return its id (`max id ever inserted + 1`).
    fn insert(&self, job: &NewJob) -> Result<JobId>;

    fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Apply `update` to row `id` if its precondition holds. Returns whether
    /// a row changed.
    fn update(&self, id: JobId, update: &JobUpdate) -> Result<bool>;

    fn query(&self, filter: &JobFilter, order: JobOrder) -> Result<Vec<Job>>;

    /// Remove row `id` if `precondition` holds. The store itself does not
    /// forbid deleting running rows; callers pass `NotRunning` for that.
    fn delete(&self, id: JobId, precondition: Precondition) -> Result<bool>;

    /// Remove every row matching `filter`, returning how many went away.
    fn delete_where(&self, filter: &JobFilter) -> Result<usize>;
}

/// Run `f` against `store` on Tokio's blocking pool.
///
/// Async callers go through this so a store waiting on a busy database does
/// not hold up the runtime thread.
pub async fn blocking<T, F>(store: &Arc<dyn JobStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn JobStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .context("store task did not complete")?
}

/// Sort rows in place according to `order` (shared by backends that cannot
/// push ordering down).
pub fn sort_jobs(jobs: &mut [Job], order: JobOrder) {
    match order {
        JobOrder::Id => jobs.sort_by_key(|j| j.id),
        JobOrder::Admission => {
            jobs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)))
        }
    }
}
