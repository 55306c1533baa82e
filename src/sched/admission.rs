// src/sched/admission.rs

//! Admission control: which pending job, if any, may start now.
//!
//! Everything here is pure so the policy can be tested without a store,
//! processes or Tokio.

use crate::types::{Job, JobStatus};

/// Weight currently consumed by running jobs.
pub fn used_capacity<'a>(running: impl IntoIterator<Item = &'a Job>) -> u32 {
    running
        .into_iter()
        .filter(|job| job.status() == JobStatus::Running)
        .map(|job| job.weight)
        .sum()
}

/// Capacity left over for new admissions (never negative).
pub fn available_capacity<'a>(capacity: u32, running: impl IntoIterator<Item = &'a Job>) -> u32 {
    capacity.saturating_sub(used_capacity(running))
}

/// Pick the next job to admit.
///
/// Among pending jobs whose weight fits in `available`, the one with the
/// highest priority wins; ties go to the lowest id. A job heavier than the
/// total capacity is never selected and simply keeps waiting.
pub fn select_next(pending: &[Job], available: u32) -> Option<&Job> {
    pending
        .iter()
        .filter(|job| job.status() == JobStatus::Pending && job.weight <= available)
        .min_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)))
}

/// Outcome of one admission decision, kept for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub used: u32,
    pub available: u32,
    pub admitted: Option<Job>,
}

/// Full admission step over a snapshot of running and pending rows.
pub fn decide(capacity: u32, running: &[Job], pending: &[Job]) -> AdmissionDecision {
    let used = used_capacity(running);
    let available = capacity.saturating_sub(used);
    AdmissionDecision {
        used,
        available,
        admitted: select_next(pending, available).cloned(),
    }
}
