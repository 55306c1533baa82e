// tests/daemon_pidfile.rs

use std::error::Error;

use taskq::config::DaemonConfig;
use taskq::daemon::{self, PidFile, live_daemon_pid, read_pid};
use taskq::errors::TaskqError;
use taskq_test_utils::probe::ScriptedProbe;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn pid_file_is_exclusive_and_removed_on_drop() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("tqd.pid");

    let held = PidFile::create(&path, 1234)?;
    assert_eq!(read_pid(&path)?, Some(1234));

    match PidFile::create(&path, 5678) {
        Err(TaskqError::AlreadyRunning(pid)) => assert_eq!(pid, 1234),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    drop(held);
    assert!(!path.exists());
    assert_eq!(read_pid(&path)?, None);
    Ok(())
}

#[test]
fn drop_leaves_a_file_written_by_someone_else() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("tqd.pid");

    let held = PidFile::create(&path, 1234)?;
    std::fs::write(&path, "999\n")?;
    drop(held);
    assert_eq!(read_pid(&path)?, Some(999));
    Ok(())
}

#[test]
fn stale_and_corrupt_pid_files_are_cleaned_up() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("tqd.pid");

    std::fs::write(&path, "4321\n")?;
    assert_eq!(live_daemon_pid(&path, &ScriptedProbe::with_alive([4321]))?, Some(4321));
    assert!(path.exists());

    assert_eq!(live_daemon_pid(&path, &ScriptedProbe::default())?, None);
    assert!(!path.exists(), "stale pid file must be removed");

    std::fs::write(&path, "not a pid")?;
    assert!(matches!(read_pid(&path), Err(TaskqError::CorruptPidFile(_))));
    assert_eq!(live_daemon_pid(&path, &ScriptedProbe::default())?, None);
    assert!(!path.exists());
    Ok(())
}

#[test]
fn start_refuses_while_a_live_daemon_holds_the_pid_file() -> TestResult {
    let dir = tempdir()?;
    let config = DaemonConfig::in_dir(dir.path());
    // This test process stands in for a running daemon.
    std::fs::write(&config.pid_path, format!("{}\n", std::process::id()))?;

    let err = daemon::start(&config, Default::default()).unwrap_err();
    assert!(matches!(err, TaskqError::AlreadyRunning(_)));
    assert!(err.is_lifecycle());
    Ok(())
}

#[test]
fn stop_without_a_daemon_reports_not_running() -> TestResult {
    let dir = tempdir()?;
    let config = DaemonConfig::in_dir(dir.path());
    let err = daemon::stop(&config).unwrap_err();
    assert!(matches!(err, TaskqError::NotRunning));
    assert_eq!(daemon::running_pid(&config)?, None);
    Ok(())
}
