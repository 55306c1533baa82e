// src/client.rs

//! Operator requests (`submit`, `list`, `remove`, `edit`, `clean`, `purge`,
//! `status`).
//!
//! None of these talk to the daemon. They read and write the shared store
//! directly, so they work whether or not the daemon is running; the daemon
//! picks up changes on its next tick.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::DaemonConfig;
use crate::errors::{Result, TaskqError};
use crate::sched::admission::used_capacity;
use crate::sched::{ProcessProbe, sweep_orphans};
use crate::store::{JobFilter, JobOrder, JobStore, JobUpdate, Precondition, SqliteJobStore};
use crate::types::{Job, JobId, JobStatus, MAX_WEIGHT, MIN_WEIGHT, NewJob};

/// Check a submission before it reaches the store.
pub fn validate_new_job(job: &NewJob) -> Result<()> {
    if job.command.trim().is_empty() {
        return Err(TaskqError::InvalidJob("command must not be empty".to_string()));
    }
    validate_weight(job.weight)?;

    let dir = &job.working_directory;
    if !dir.is_absolute() {
        return Err(TaskqError::InvalidJob(format!(
            "working directory must be absolute (got {})",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(TaskqError::InvalidJob(format!(
            "working directory {} does not exist",
            dir.display()
        )));
    }
    Ok(())
}

fn validate_weight(weight: u32) -> Result<()> {
    if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        return Err(TaskqError::InvalidJob(format!(
            "weight must be between {MIN_WEIGHT} and {MAX_WEIGHT} (got {weight})"
        )));
    }
    Ok(())
}

/// Validate and insert a pending job. Returns the new id.
pub fn submit(store: &dyn JobStore, job: &NewJob) -> Result<JobId> {
    validate_new_job(job)?;
    let id = store.insert(job)?;
    info!(
        job_id = id,
        priority = job.priority,
        weight = job.weight,
        cwd = %job.working_directory.display(),
        "job submitted"
    );
    Ok(id)
}

/// Every row in id order, after reclassifying dead workers as orphans.
pub fn list(store: &dyn JobStore, probe: &dyn ProcessProbe) -> Result<Vec<Job>> {
    sweep_orphans(store, probe, &HashSet::new())?;
    store.query(&JobFilter::all(), JobOrder::Id)
}

/// Delete a job that is not running.
pub fn remove(store: &dyn JobStore, id: JobId) -> Result<()> {
    if store.delete(id, Precondition::NotRunning)? {
        info!(job_id = id, "job removed");
        return Ok(());
    }
    match store.get(id)? {
        None => Err(TaskqError::JobNotFound(id)),
        Some(_) => Err(TaskqError::JobRunning(id)),
    }
}

/// Change priority and/or weight of a pending job and return the new row.
pub fn edit(
    store: &dyn JobStore,
    id: JobId,
    priority: Option<i64>,
    weight: Option<u32>,
) -> Result<Job> {
    if priority.is_none() && weight.is_none() {
        return Err(TaskqError::InvalidJob(
            "nothing to change; pass priority=P and/or weight=W".to_string(),
        ));
    }
    if let Some(w) = weight {
        validate_weight(w)?;
    }

    let changed = store.update(id, &JobUpdate::scheduling(priority, weight))?;
    let job = store.get(id)?.ok_or(TaskqError::JobNotFound(id))?;
    if !changed {
        return Err(TaskqError::JobNotPending(id, job.status()));
    }
    info!(job_id = id, ?priority, ?weight, "job edited");
    Ok(job)
}

/// Delete finished and orphaned rows. Returns how many were removed.
pub fn clean(store: &dyn JobStore) -> Result<usize> {
    let removed = store.delete_where(&JobFilter::terminal())?;
    debug!(removed, "cleaned terminal jobs");
    Ok(removed)
}

/// What `purge` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed_jobs: usize,
    pub removed_files: Vec<PathBuf>,
}

/// `clean`, and with the daemon stopped also delete the store and daemon
/// log. Running it again is a no-op.
pub fn purge(config: &DaemonConfig, daemon_pid: Option<i32>) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();

    if config.store_path.exists() {
        let store = SqliteJobStore::open(&config.store_path)?;
        report.removed_jobs = clean(&store)?;
    }

    if daemon_pid.is_none() {
        for path in [&config.store_path, &config.log_path] {
            if remove_file_if_present(path)? {
                report.removed_files.push(path.clone());
            }
        }
    }
    Ok(report)
}

fn remove_file_if_present(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Snapshot for `tq status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub daemon_pid: Option<i32>,
    pub counts: BTreeMap<JobStatus, usize>,
    pub used_capacity: u32,
    pub capacity: u32,
}

pub fn status(
    store: &dyn JobStore,
    probe: &dyn ProcessProbe,
    capacity: u32,
    daemon_pid: Option<i32>,
) -> Result<StatusReport> {
    let jobs = list(store, probe)?;
    let mut counts: BTreeMap<JobStatus, usize> =
        JobStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for job in &jobs {
        *counts.entry(job.status()).or_default() += 1;
    }
    Ok(StatusReport {
        daemon_pid,
        counts,
        used_capacity: used_capacity(&jobs),
        capacity,
    })
}
