use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taskq::exec::{Launcher, WorkerReport};
use taskq::store::{JobStore, JobUpdate};
use taskq::types::{Job, JobId, now_epoch_secs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A fake launcher that:
/// - records which jobs were launched, in order
/// - keeps each job "running" (row claimed, no process) until the test calls
///   [`FakeLauncher::complete`].
#[derive(Clone)]
pub struct FakeLauncher {
    store: Arc<dyn JobStore>,
    launched: Arc<Mutex<Vec<JobId>>>,
    gates: Arc<Mutex<HashMap<JobId, oneshot::Sender<i32>>>>,
}

impl FakeLauncher {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            launched: Arc::new(Mutex::new(Vec::new())),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ids handed to `launch`, in launch order.
    pub fn launched(&self) -> Vec<JobId> {
        self.launched.lock().unwrap().clone()
    }

    /// Finish job `id` with `exit_code`: the outcome is written to the store
    /// right away and the supervisor handle resolves.
    ///
    /// Panics if the job was never launched or was already completed.
    pub fn complete(&self, id: JobId, exit_code: i32) {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(&id)
            .unwrap_or_else(|| panic!("job {id} is not held by the fake launcher"));
        self.store
            .update(id, &JobUpdate::finish(exit_code, now_epoch_secs()))
            .expect("recording fake outcome");
        let _ = gate.send(exit_code);
    }
}

impl Launcher for FakeLauncher {
    fn launch(&mut self, job: Job, _claim_pid: i64) -> JoinHandle<WorkerReport> {
        let (tx, rx) = oneshot::channel();
        self.launched.lock().unwrap().push(job.id);
        self.gates.lock().unwrap().insert(job.id, tx);

        let job_id = job.id;
        tokio::spawn(async move {
            match rx.await {
                Ok(exit_code) => WorkerReport {
                    job_id,
                    exit_code,
                    recorded: true,
                },
                // Launcher dropped without completing: let the reaper record it.
                Err(_) => WorkerReport {
                    job_id,
                    exit_code: -1,
                    recorded: false,
                },
            }
        })
    }
}
