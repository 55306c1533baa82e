// src/sched/sweep.rs

//! Liveness sweep: reclassify running rows whose worker process is gone.
//!
//! An orphaned row keeps a null exit code. It is not put back to pending
//! (the command's side effects are unknown) and no outcome is invented.

use std::collections::HashSet;
use std::fmt::Debug;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::store::{JobFilter, JobOrder, JobStore, JobUpdate};
use crate::types::{JobId, JobStatus};

/// Answers "does a process with this pid exist?".
pub trait ProcessProbe: Send + Sync + Debug {
    fn is_alive(&self, pid: i64) -> bool;
}

/// Probe backed by `kill(pid, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessProbe;

impl ProcessProbe for OsProcessProbe {
    fn is_alive(&self, pid: i64) -> bool {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            // Exists but belongs to someone else.
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

/// Mark every running row whose worker no longer exists as orphaned.
///
/// Rows listed in `owned` belong to supervisors of the calling daemon and
/// are skipped; their outcome is about to be recorded by the supervisor.
/// Returns the ids that were reclassified. Running the sweep twice in a row
/// is a no-op the second time.
pub fn sweep_orphans(
    store: &dyn JobStore,
    probe: &dyn ProcessProbe,
    owned: &HashSet<JobId>,
) -> Result<Vec<JobId>> {
    let running = store.query(&JobFilter::status(JobStatus::Running), JobOrder::Id)?;
    let mut orphaned = Vec::new();

    for job in running {
        if owned.contains(&job.id) {
            continue;
        }
        let Some(pid) = job.worker_pid else {
            continue;
        };
        if probe.is_alive(pid) {
            debug!(job_id = job.id, pid, "worker still alive");
            continue;
        }
        // Compare-and-set on the observed pid so a concurrent completion
        // wins over the orphan mark.
        if store.update(job.id, &JobUpdate::orphan(pid))? {
            warn!(
                job_id = job.id,
                pid,
                command = %job.command,
                "worker process vanished without reporting; job marked orphaned"
            );
            orphaned.push(job.id);
        }
    }

    Ok(orphaned)
}
