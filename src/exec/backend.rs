// src/exec/backend.rs

//! Pluggable launcher abstraction.
//!
//! The scheduler hands claimed jobs to a `Launcher` instead of spawning
//! supervisors itself. Production code uses [`ProcessLauncher`]; tests can
//! provide their own implementation that, for example, holds jobs "running"
//! until told to complete them.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::exec::output::OutputSinks;
use crate::exec::supervisor::{WorkerReport, WorkerSupervisor};
use crate::store::JobStore;
use crate::types::Job;

/// Trait abstracting how claimed jobs are executed.
pub trait Launcher: Send {
    /// Start executing `job`, which the scheduler has already claimed with
    /// `claim_pid`. The returned handle resolves once the job's outcome has
    /// been (or should have been) written to the store.
    fn launch(&mut self, job: Job, claim_pid: i64) -> JoinHandle<WorkerReport>;
}

/// Launcher used in production: one [`WorkerSupervisor`] per job, each on
/// its own Tokio task.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    store: Arc<dyn JobStore>,
    sinks: OutputSinks,
}

impl ProcessLauncher {
    pub fn new(store: Arc<dyn JobStore>, sinks: OutputSinks) -> Self {
        Self { store, sinks }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, job: Job, claim_pid: i64) -> JoinHandle<WorkerReport> {
        let supervisor = WorkerSupervisor::new(Arc::clone(&self.store), self.sinks.clone(), claim_pid);
        tokio::spawn(supervisor.run(job))
    }
}
