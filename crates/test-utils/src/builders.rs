#![allow(dead_code)]

use std::path::PathBuf;

use taskq::types::{DEFAULT_PRIORITY, DEFAULT_WEIGHT, Job, JobId, NewJob, ORPHAN_PID};

/// Builder for raw `Job` rows, for seeding stores in any state.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    /// A pending job with default priority and weight.
    pub fn pending(id: JobId) -> Self {
        Self {
            job: Job {
                id,
                worker_pid: None,
                working_directory: std::env::temp_dir(),
                command: format!("echo job-{id}"),
                exit_code: None,
                start_time: None,
                end_time: None,
                priority: DEFAULT_PRIORITY,
                weight: DEFAULT_WEIGHT,
            },
        }
    }

    pub fn running(mut self, pid: i64) -> Self {
        self.job.worker_pid = Some(pid);
        self.job.start_time = Some(1_000.0);
        self
    }

    pub fn finished(mut self, exit_code: i32) -> Self {
        self.job.worker_pid = None;
        self.job.exit_code = Some(exit_code);
        self.job.start_time.get_or_insert(1_000.0);
        self.job.end_time = Some(1_010.0);
        self
    }

    pub fn orphaned(mut self) -> Self {
        self.job.worker_pid = Some(ORPHAN_PID);
        self.job.start_time.get_or_insert(1_000.0);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.job.weight = weight;
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.job.command = command.to_string();
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job.working_directory = dir.into();
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// A submission for `command` in the system temp dir.
pub fn new_job(command: &str) -> NewJob {
    NewJob::new(std::env::temp_dir(), command)
}
