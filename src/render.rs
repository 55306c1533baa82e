// src/render.rs

//! Plain-text rendering for `tq list` and `tq status`.

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::client::StatusReport;
use crate::types::{DEFAULT_PRIORITY, DEFAULT_WEIGHT, Job, JobStatus};

/// `3723.5` -> `1h2m3.500s`.
pub fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0);
    let whole = secs.trunc() as u64;
    let hours = whole / 3600;
    let minutes = (whole / 60) % 60;
    let seconds = secs % 60.0;
    format!("{hours}h{minutes}m{seconds:.3}s")
}

/// Epoch seconds as an RFC 3339 UTC timestamp, truncated to seconds.
pub fn format_timestamp(epoch_secs: f64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch_secs.trunc() as i64)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{epoch_secs:.0}"))
}

/// Short status tag: `pending`, `running pid 42`, `ok`, `failed 3`,
/// `orphaned`.
pub fn status_label(job: &Job) -> String {
    match job.status() {
        JobStatus::Pending => "pending".to_string(),
        JobStatus::Running => match job.worker_pid {
            Some(pid) => format!("running pid {pid}"),
            None => "running".to_string(),
        },
        JobStatus::Finished => match job.exit_code {
            Some(0) => "ok".to_string(),
            Some(code) => format!("failed {code}"),
            None => "finished".to_string(),
        },
        JobStatus::Orphaned => "orphaned".to_string(),
    }
}

/// One job as a small block of lines. `now` is used for the elapsed time of
/// running jobs.
pub fn render_job(job: &Job, now: f64) -> String {
    let mut out = String::new();

    let priority = if job.priority == DEFAULT_PRIORITY {
        "-".to_string()
    } else {
        job.priority.to_string()
    };
    let weight = if job.weight == DEFAULT_WEIGHT {
        "-".to_string()
    } else {
        job.weight.to_string()
    };
    let _ = writeln!(
        out,
        "{:>4}  [{}]  pri {}  weight {}",
        job.id,
        status_label(job),
        priority,
        weight
    );

    match (job.start_time, job.end_time, job.elapsed()) {
        (Some(start), Some(end), Some(elapsed)) => {
            let _ = writeln!(
                out,
                "      time  {} ({} -> {})",
                format_duration(elapsed),
                format_timestamp(start),
                format_timestamp(end)
            );
        }
        (Some(start), None, _) => {
            let _ = writeln!(
                out,
                "      time  started {}, {} elapsed",
                format_timestamp(start),
                format_duration(now - start)
            );
        }
        _ => {}
    }

    let _ = writeln!(out, "      cwd   {}", job.working_directory.display());
    let _ = writeln!(out, "      cmd   {}", job.command);
    out
}

/// All jobs, in the order given.
pub fn render_jobs(jobs: &[Job], now: f64) -> String {
    if jobs.is_empty() {
        return "no jobs\n".to_string();
    }
    jobs.iter().map(|job| render_job(job, now)).collect()
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    match report.daemon_pid {
        Some(pid) => {
            let _ = writeln!(out, "daemon: running (pid {pid})");
        }
        None => {
            let _ = writeln!(out, "daemon: stopped");
        }
    }
    let _ = writeln!(
        out,
        "capacity: {}/{} in use",
        report.used_capacity, report.capacity
    );
    let counts = report
        .counts
        .iter()
        .map(|(status, n)| format!("{status} {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "jobs: {counts}");
    out
}
