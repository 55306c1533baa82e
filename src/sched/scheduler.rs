// src/sched/scheduler.rs

//! The daemon's control loop.
//!
//! Each tick the scheduler:
//! 1. reaps supervisors whose job is done (making sure the outcome landed in
//!    the store),
//! 2. runs the liveness sweep when it is due,
//! 3. asks the admission controller for at most one job and launches it.
//!
//! The loop is the only writer of `worker_pid` on pending rows, which keeps
//! the capacity computation race-free with plain row-level updates.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::exec::{Launcher, WorkerReport};
use crate::sched::admission;
use crate::sched::sweep::{ProcessProbe, sweep_orphans};
use crate::store::{JobFilter, JobOrder, JobStore, JobUpdate, blocking};
use crate::types::{DEFAULT_CAPACITY, JobId, JobStatus, SPAWN_FAILURE_EXIT_CODE, now_epoch_secs};

/// Knobs for the scheduler loop.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub capacity: u32,
    pub tick_interval: Duration,
    /// Run the liveness sweep every this many ticks; 0 = startup only.
    pub sweep_interval_ticks: u64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tick_interval: Duration::from_secs(1),
            sweep_interval_ticks: 10,
        }
    }
}

/// What a single tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No capacity, or nothing eligible.
    Idle,
    /// Admitted and launched this job.
    Dispatched(JobId),
}

pub struct Scheduler<L: Launcher> {
    store: Arc<dyn JobStore>,
    launcher: L,
    probe: Arc<dyn ProcessProbe>,
    options: SchedulerOptions,
    /// Pid written into `worker_pid` when claiming a row.
    claim_pid: i64,
    pool: HashMap<JobId, JoinHandle<WorkerReport>>,
    /// Outcomes of reaped jobs that could not be written yet.
    unrecorded: HashMap<JobId, JobUpdate>,
    ticks: u64,
}

impl<L: Launcher> fmt::Debug for Scheduler<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .field("claim_pid", &self.claim_pid)
            .field("active", &self.pool.len())
            .field("unrecorded", &self.unrecorded.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<L: Launcher> Scheduler<L> {
    pub fn new(
        store: Arc<dyn JobStore>,
        launcher: L,
        probe: Arc<dyn ProcessProbe>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            store,
            launcher,
            probe,
            options,
            claim_pid: i64::from(std::process::id()),
            pool: HashMap::new(),
            unrecorded: HashMap::new(),
            ticks: 0,
        }
    }

    /// Override the pid used for claims (tests use a fake pid).
    pub fn with_claim_pid(mut self, pid: i64) -> Self {
        self.claim_pid = pid;
        self
    }

    pub fn claim_pid(&self) -> i64 {
        self.claim_pid
    }

    /// Jobs currently owned by this scheduler: supervised, or reaped with
    /// an outcome still waiting to be written.
    pub fn active_jobs(&self) -> HashSet<JobId> {
        self.pool
            .keys()
            .chain(self.unrecorded.keys())
            .copied()
            .collect()
    }

    /// Main loop. Returns as soon as `shutdown` fires; in-flight jobs are
    /// not drained and their processes keep running.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            capacity = self.options.capacity,
            tick_ms = self.options.tick_interval.as_millis() as u64,
            "scheduler started"
        );

        if let Err(err) = self.sweep().await {
            warn!(error = %err, "startup liveness sweep failed");
        }

        let mut interval = tokio::time::interval(self.options.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(TickOutcome::Dispatched(id)) => debug!(job_id = id, "dispatching"),
                        Ok(TickOutcome::Idle) => {}
                        // A broken tick must never take the daemon down.
                        Err(err) => error!(error = %err, "scheduler tick failed"),
                    }
                }
            }
        }

        let abandoned = self.pool.len();
        for (_, handle) in self.pool.drain() {
            handle.abort();
        }
        self.record_outcomes().await;
        info!(abandoned, unrecorded = self.unrecorded.len(), "scheduler stopped");
        Ok(())
    }

    /// One pass of reap, sweep (when due) and admission.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.ticks += 1;
        self.reap().await;

        let every = self.options.sweep_interval_ticks;
        if every > 0 && self.ticks % every == 0 {
            self.sweep().await?;
        }

        self.admit().await
    }

    /// Liveness sweep over rows not owned by this scheduler.
    pub async fn sweep(&self) -> Result<Vec<JobId>> {
        let probe = Arc::clone(&self.probe);
        let active = self.active_jobs();
        blocking(&self.store, move |store| {
            sweep_orphans(store, probe.as_ref(), &active)
        })
        .await
    }

    /// Remove finished supervisors from the pool and write any outcome the
    /// supervisor could not write itself. Writes that fail here are kept and
    /// retried on the next reap.
    pub async fn reap(&mut self) -> Vec<WorkerReport> {
        let done: Vec<JobId> = self
            .pool
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        let mut reports = Vec::with_capacity(done.len());
        for id in done {
            let Some(handle) = self.pool.remove(&id) else {
                continue;
            };
            let report = match handle.await {
                Ok(report) => report,
                Err(err) => {
                    error!(job_id = id, error = %err, "supervisor task failed");
                    WorkerReport {
                        job_id: id,
                        exit_code: SPAWN_FAILURE_EXIT_CODE,
                        recorded: false,
                    }
                }
            };
            if !report.recorded {
                self.unrecorded
                    .insert(id, JobUpdate::finish(report.exit_code, now_epoch_secs()));
            }
            debug!(job_id = id, exit_code = report.exit_code, "reaped supervisor");
            reports.push(report);
        }

        self.record_outcomes().await;
        reports
    }

    async fn record_outcomes(&mut self) {
        for (id, update) in std::mem::take(&mut self.unrecorded) {
            let retry = update.clone();
            match blocking(&self.store, move |store| store.update(id, &update)).await {
                Ok(_) => debug!(job_id = id, "recorded outcome after reap"),
                Err(err) => {
                    warn!(job_id = id, error = %err, "failed to record job outcome, will retry");
                    self.unrecorded.insert(id, retry);
                }
            }
        }
    }

    /// Admit at most one pending job.
    pub async fn admit(&mut self) -> Result<TickOutcome> {
        let (running, pending) = blocking(&self.store, |store| {
            let running = store.query(&JobFilter::status(JobStatus::Running), JobOrder::Id)?;
            let pending =
                store.query(&JobFilter::status(JobStatus::Pending), JobOrder::Admission)?;
            Ok((running, pending))
        })
        .await?;

        let decision = admission::decide(self.options.capacity, &running, &pending);
        let Some(job) = decision.admitted else {
            return Ok(TickOutcome::Idle);
        };

        let start_time = now_epoch_secs();
        let claim = JobUpdate::claim(self.claim_pid, start_time);
        let id = job.id;
        if !blocking(&self.store, move |store| store.update(id, &claim)).await? {
            // Removed or edited away between query and claim.
            debug!(job_id = job.id, "pending job vanished before claim");
            return Ok(TickOutcome::Idle);
        }

        info!(
            job_id = job.id,
            priority = job.priority,
            weight = job.weight,
            used = decision.used,
            available = decision.available,
            "admitting job"
        );

        let mut claimed = job;
        claimed.worker_pid = Some(self.claim_pid);
        claimed.start_time = Some(start_time);
        let handle = self.launcher.launch(claimed, self.claim_pid);
        self.pool.insert(id, handle);
        Ok(TickOutcome::Dispatched(id))
    }
}
