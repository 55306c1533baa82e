// tests/sweep.rs

use std::collections::HashSet;
use std::error::Error;

use taskq::sched::{OsProcessProbe, ProcessProbe, sweep_orphans};
use taskq::store::{JobStore, MemoryJobStore};
use taskq::types::{JobStatus, ORPHAN_PID};
use taskq_test_utils::builders::JobBuilder;
use taskq_test_utils::probe::ScriptedProbe;

type TestResult = Result<(), Box<dyn Error>>;

fn seeded() -> Result<MemoryJobStore, Box<dyn Error>> {
    let store = MemoryJobStore::new();
    store.insert_raw(JobBuilder::pending(1).running(101).build())?;
    store.insert_raw(JobBuilder::pending(2).running(102).build())?;
    store.insert_raw(JobBuilder::pending(3).build())?;
    store.insert_raw(JobBuilder::pending(4).finished(0).build())?;
    Ok(store)
}

#[test]
fn dead_workers_become_orphans_and_live_ones_stay_running() -> TestResult {
    let store = seeded()?;
    let probe = ScriptedProbe::with_alive([102]);

    let orphaned = sweep_orphans(&store, &probe, &HashSet::new())?;
    assert_eq!(orphaned, vec![1]);

    let job = store.get(1)?.unwrap();
    assert_eq!(job.status(), JobStatus::Orphaned);
    assert_eq!(job.worker_pid, Some(ORPHAN_PID));
    assert_eq!(job.exit_code, None, "no outcome is invented");

    assert_eq!(store.get(2)?.unwrap().status(), JobStatus::Running);
    assert_eq!(store.get(3)?.unwrap().status(), JobStatus::Pending);
    assert_eq!(store.get(4)?.unwrap().status(), JobStatus::Finished);
    Ok(())
}

#[test]
fn sweep_twice_is_a_no_op_the_second_time() -> TestResult {
    let store = seeded()?;
    let probe = ScriptedProbe::default();

    let first = sweep_orphans(&store, &probe, &HashSet::new())?;
    assert_eq!(first, vec![1, 2]);
    let second = sweep_orphans(&store, &probe, &HashSet::new())?;
    assert!(second.is_empty());
    Ok(())
}

#[test]
fn owned_rows_are_skipped() -> TestResult {
    let store = seeded()?;
    let probe = ScriptedProbe::default();
    let owned: HashSet<_> = [1].into_iter().collect();

    let orphaned = sweep_orphans(&store, &probe, &owned)?;
    assert_eq!(orphaned, vec![2]);
    assert_eq!(store.get(1)?.unwrap().status(), JobStatus::Running);
    Ok(())
}

#[test]
fn os_probe_sees_this_process_and_rejects_bogus_pids() {
    let probe = OsProcessProbe;
    assert!(probe.is_alive(i64::from(std::process::id())));
    assert!(!probe.is_alive(0));
    assert!(!probe.is_alive(ORPHAN_PID));
    assert!(!probe.is_alive(i64::MAX));
}

#[test]
fn os_probe_reports_exited_child_as_dead() -> TestResult {
    let mut child = std::process::Command::new("true").spawn()?;
    let pid = i64::from(child.id());
    child.wait()?;
    assert!(!OsProcessProbe.is_alive(pid));
    Ok(())
}
