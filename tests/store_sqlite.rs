// tests/store_sqlite.rs

use std::error::Error;

use taskq::store::{JobFilter, JobOrder, JobStore, JobUpdate, Precondition, SqliteJobStore};
use taskq::types::{JobStatus, ORPHAN_PID};
use taskq_test_utils::builders::new_job;
use taskq_test_utils::init_tracing;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn ids_increase_and_are_never_reused() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;

    let a = store.insert(&new_job("echo a"))?;
    let b = store.insert(&new_job("echo b"))?;
    assert_eq!(b, a + 1);

    // Deleting the newest row must not hand its id out again.
    assert!(store.delete(b, Precondition::NotRunning)?);
    let c = store.insert(&new_job("echo c"))?;
    assert!(c > b, "id {c} reused after deleting {b}");
    Ok(())
}

#[test]
fn rows_survive_reopening_the_store() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("jobs.db");

    let id = {
        let store = SqliteJobStore::open(&path)?;
        store.insert(&new_job("echo persisted").with_priority(3).with_weight(4))?
    };

    let store = SqliteJobStore::open(&path)?;
    let job = store.get(id)?.expect("row must survive reopen");
    assert_eq!(job.command, "echo persisted");
    assert_eq!(job.priority, 3);
    assert_eq!(job.weight, 4);
    assert_eq!(job.status(), JobStatus::Pending);

    let next = store.insert(&new_job("echo next"))?;
    assert_eq!(next, id + 1);
    Ok(())
}

#[test]
fn claim_only_applies_to_pending_rows() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;
    let id = store.insert(&new_job("sleep 1"))?;

    assert!(store.update(id, &JobUpdate::claim(100, 1.0))?);
    // Second claim loses: the row is no longer pending.
    assert!(!store.update(id, &JobUpdate::claim(200, 2.0))?);

    let job = store.get(id)?.unwrap();
    assert_eq!(job.worker_pid, Some(100));
    assert_eq!(job.start_time, Some(1.0));
    assert_eq!(job.status(), JobStatus::Running);
    Ok(())
}

#[test]
fn finish_clears_pid_and_records_outcome_together() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;
    let id = store.insert(&new_job("false"))?;
    store.update(id, &JobUpdate::claim(100, 10.0))?;

    assert!(store.update(id, &JobUpdate::finish(1, 12.5))?);
    let job = store.get(id)?.unwrap();
    assert_eq!(job.worker_pid, None);
    assert_eq!(job.exit_code, Some(1));
    assert_eq!(job.end_time, Some(12.5));
    assert_eq!(job.status(), JobStatus::Finished);

    // Already finished: a second outcome is ignored.
    assert!(!store.update(id, &JobUpdate::finish(0, 13.0))?);
    assert_eq!(store.get(id)?.unwrap().exit_code, Some(1));
    Ok(())
}

#[test]
fn orphan_mark_requires_the_observed_pid() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;
    let id = store.insert(&new_job("sleep 5"))?;
    store.update(id, &JobUpdate::claim(100, 1.0))?;
    store.update(id, &JobUpdate::reassign(100, 4242))?;

    // Stale observation of the claim pid does nothing.
    assert!(!store.update(id, &JobUpdate::orphan(100))?);
    assert!(store.update(id, &JobUpdate::orphan(4242))?);

    let job = store.get(id)?.unwrap();
    assert_eq!(job.worker_pid, Some(ORPHAN_PID));
    assert_eq!(job.status(), JobStatus::Orphaned);
    Ok(())
}

#[test]
fn query_filters_by_status_and_orders() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;

    let low = store.insert(&new_job("echo low").with_priority(0))?;
    let high = store.insert(&new_job("echo high").with_priority(5))?;
    let mid = store.insert(&new_job("echo mid").with_priority(1))?;
    let high2 = store.insert(&new_job("echo high2").with_priority(5))?;
    let running = store.insert(&new_job("echo running"))?;
    store.update(running, &JobUpdate::claim(1, 1.0))?;

    let pending = store.query(&JobFilter::status(JobStatus::Pending), JobOrder::Admission)?;
    let ids: Vec<_> = pending.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![high, high2, mid, low]);

    let all = store.query(&JobFilter::all(), JobOrder::Id)?;
    let ids: Vec<_> = all.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![low, high, mid, high2, running]);

    let running_rows = store.query(&JobFilter::status(JobStatus::Running), JobOrder::Id)?;
    assert_eq!(running_rows.len(), 1);
    assert_eq!(running_rows[0].id, running);
    Ok(())
}

#[test]
fn delete_respects_precondition_and_delete_where_removes_terminal_rows() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;

    let pending = store.insert(&new_job("echo p"))?;
    let running = store.insert(&new_job("echo r"))?;
    let finished = store.insert(&new_job("echo f"))?;
    let orphaned = store.insert(&new_job("echo o"))?;
    store.update(running, &JobUpdate::claim(10, 1.0))?;
    store.update(finished, &JobUpdate::claim(11, 1.0))?;
    store.update(finished, &JobUpdate::finish(0, 2.0))?;
    store.update(orphaned, &JobUpdate::claim(12, 1.0))?;
    store.update(orphaned, &JobUpdate::orphan(12))?;

    assert!(!store.delete(running, Precondition::NotRunning)?);
    assert!(store.get(running)?.is_some());

    assert_eq!(store.delete_where(&JobFilter::terminal())?, 2);
    let left: Vec<_> = store
        .query(&JobFilter::all(), JobOrder::Id)?
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(left, vec![pending, running]);
    Ok(())
}

#[test]
fn scheduling_edit_only_touches_pending_rows() -> TestResult {
    let dir = tempdir()?;
    let store = SqliteJobStore::open(dir.path().join("jobs.db"))?;
    let id = store.insert(&new_job("echo x"))?;

    assert!(store.update(id, &JobUpdate::scheduling(Some(7), None))?);
    let job = store.get(id)?.unwrap();
    assert_eq!((job.priority, job.weight), (7, 10));

    store.update(id, &JobUpdate::claim(1, 1.0))?;
    assert!(!store.update(id, &JobUpdate::scheduling(None, Some(2)))?);
    assert_eq!(store.get(id)?.unwrap().weight, 10);
    Ok(())
}

#[test]
fn corrupt_store_is_moved_aside() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("jobs.db");
    std::fs::write(&path, "this is definitely not a sqlite database file ".repeat(20))?;

    let store = SqliteJobStore::open(&path)?;
    assert!(store.query(&JobFilter::all(), JobOrder::Id)?.is_empty());
    assert!(dir.path().join("jobs.db.corrupt").exists());

    let id = store.insert(&new_job("echo fresh"))?;
    assert_eq!(id, 1);
    Ok(())
}

#[test]
fn store_directory_is_created_on_open() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("state").join("jobs.db");
    let store = SqliteJobStore::open(&path)?;
    store.insert(&new_job("echo hi"))?;
    assert!(path.exists());
    Ok(())
}
