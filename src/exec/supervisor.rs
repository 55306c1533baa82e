// src/exec/supervisor.rs

//! Runs one admitted job to completion in its own OS process.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::exec::output::OutputSinks;
use crate::store::{JobStore, JobUpdate, blocking};
use crate::types::{Job, JobId, SPAWN_FAILURE_EXIT_CODE, now_epoch_secs};

/// What a supervisor reports back to the scheduler once its child is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub job_id: JobId,
    pub exit_code: i32,
    /// Whether the final store update went through. If not, the scheduler's
    /// reap step writes the outcome instead.
    pub recorded: bool,
}

/// Owns exactly one child process. Supervisors share nothing with each other
/// except the store.
#[derive(Debug, Clone)]
pub struct WorkerSupervisor {
    store: Arc<dyn JobStore>,
    sinks: OutputSinks,
    /// Pid the scheduler used when it claimed the row.
    claim_pid: i64,
}

impl WorkerSupervisor {
    pub fn new(store: Arc<dyn JobStore>, sinks: OutputSinks, claim_pid: i64) -> Self {
        Self {
            store,
            sinks,
            claim_pid,
        }
    }

    /// Execute `job` (already claimed) and record its outcome.
    ///
    /// Never fails: a command that cannot be spawned is recorded with
    /// [`SPAWN_FAILURE_EXIT_CODE`] so the scheduler treats every job the same.
    pub async fn run(self, job: Job) -> WorkerReport {
        let exit_code = match self.execute(&job).await {
            Ok(code) => code,
            Err(err) => {
                error!(
                    job_id = job.id,
                    cwd = %job.working_directory.display(),
                    error = %err,
                    "failed to execute job"
                );
                SPAWN_FAILURE_EXIT_CODE
            }
        };

        let id = job.id;
        let finish = JobUpdate::finish(exit_code, now_epoch_secs());
        let recorded = match blocking(&self.store, move |store| store.update(id, &finish)).await {
            Ok(changed) => {
                if !changed {
                    warn!(job_id = job.id, "job row already finished or removed");
                }
                true
            }
            Err(err) => {
                error!(job_id = job.id, error = %err, "failed to record job outcome");
                false
            }
        };

        info!(job_id = job.id, exit_code, "job finished");
        WorkerReport {
            job_id: job.id,
            exit_code,
            recorded,
        }
    }

    async fn execute(&self, job: &Job) -> anyhow::Result<i32> {
        info!(
            job_id = job.id,
            cwd = %job.working_directory.display(),
            cmd = %job.command,
            "starting job process"
        );

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&job.command)
            .current_dir(&job.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Jobs outlive a stopped daemon.
            .kill_on_drop(false);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning process for job {}", job.id))?;

        if let Some(pid) = child.id() {
            let pid = i64::from(pid);
            let id = job.id;
            let reassign = JobUpdate::reassign(self.claim_pid, pid);
            match blocking(&self.store, move |store| store.update(id, &reassign)).await {
                Ok(true) => debug!(job_id = job.id, pid, "recorded worker pid"),
                Ok(false) => warn!(job_id = job.id, pid, "job row no longer claimed by this daemon"),
                Err(err) => warn!(job_id = job.id, pid, error = %err, "failed to record worker pid"),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for process of job {}", job.id))?;
        let code = exit_code_of(output.status);

        if let Err(err) = self
            .sinks
            .append(&job.working_directory, &output.stdout, &output.stderr)
            .await
        {
            warn!(job_id = job.id, error = %err, "failed to append job output");
        }

        info!(
            job_id = job.id,
            exit_code = code,
            success = output.status.success(),
            "job process exited"
        );
        Ok(code)
    }
}

/// Shell convention: a signal-terminated child reports `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => SPAWN_FAILURE_EXIT_CODE,
    }
}
