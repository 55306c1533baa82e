// src/store/memory.rs

//! In-memory [`JobStore`] used by tests and by anything that wants the
//! scheduler without a database file.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;

use crate::errors::Result;
use crate::store::{JobFilter, JobOrder, JobStore, JobUpdate, Precondition, sort_jobs};
use crate::types::{Job, JobId, NewJob};

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<JobId, Job>,
    /// Highest id ever handed out, so deleted ids are never recycled.
    last_id: JobId,
}

/// Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully specified row as-is (tests use this to fabricate
    /// running or orphaned rows).
    pub fn insert_raw(&self, job: Job) -> Result<()> {
        let mut inner = self.lock()?;
        inner.last_id = inner.last_id.max(job.id);
        inner.rows.insert(job.id, job);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory job store mutex poisoned").into())
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: &NewJob) -> Result<JobId> {
        let mut inner = self.lock()?;
        let id = inner.last_id + 1;
        inner.last_id = id;
        inner.rows.insert(
            id,
            Job {
                id,
                worker_pid: None,
                working_directory: job.working_directory.clone(),
                command: job.command.clone(),
                exit_code: None,
                start_time: None,
                end_time: None,
                priority: job.priority,
                weight: job.weight,
            },
        );
        Ok(id)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn update(&self, id: JobId, update: &JobUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        let mut inner = self.lock()?;
        match inner.rows.get_mut(&id) {
            Some(job) if update.precondition.holds_for(job) => {
                update.apply_to(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn query(&self, filter: &JobFilter, order: JobOrder) -> Result<Vec<Job>> {
        let inner = self.lock()?;
        let mut jobs: Vec<Job> = inner
            .rows
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        sort_jobs(&mut jobs, order);
        Ok(jobs)
    }

    fn delete(&self, id: JobId, precondition: Precondition) -> Result<bool> {
        let mut inner = self.lock()?;
        match inner.rows.get(&id) {
            Some(job) if precondition.holds_for(job) => {
                inner.rows.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_where(&self, filter: &JobFilter) -> Result<usize> {
        let mut inner = self.lock()?;
        let before = inner.rows.len();
        inner.rows.retain(|_, job| !filter.matches(job));
        Ok(before - inner.rows.len())
    }
}
