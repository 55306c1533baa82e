// tests/config.rs

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use taskq::config::{RawConfigFile, load_and_validate, load_from_path, resolve_config};
use taskq::errors::TaskqError;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

fn parse(toml_src: &str) -> RawConfigFile {
    toml::from_str(toml_src).expect("test config must parse")
}

#[test]
fn defaults_live_in_home_and_are_per_user() -> TestResult {
    let cfg = resolve_config(RawConfigFile::default(), Some(Path::new("/home/ada")), 1000)?;
    assert_eq!(cfg.store_path, Path::new("/home/ada/.tqd_1000.db"));
    assert_eq!(cfg.log_path, Path::new("/home/ada/.tqd_1000.log"));
    assert_eq!(cfg.pid_path, Path::new("/home/ada/.tqd_1000.pid"));
    assert_eq!(cfg.capacity, 10);
    assert_eq!(cfg.tick_interval, Duration::from_secs(1));
    assert_eq!(cfg.sweep_interval_ticks, 10);
    assert_eq!(cfg.stdout_file, "tq.out");
    assert_eq!(cfg.stderr_file, "tq.err");
    Ok(())
}

#[test]
fn explicit_values_and_tilde_paths_are_honoured() -> TestResult {
    let raw = parse(
        r#"
        [paths]
        store = "~/state/jobs.db"
        log = "/var/tmp/tqd.log"
        pid_file = "~/state/tqd.pid"

        [scheduler]
        capacity = 4
        tick_interval_ms = 250
        sweep_interval_ticks = 0

        [output]
        stdout_file = "job.out"
        stderr_file = "job.err"
        "#,
    );
    let cfg = resolve_config(raw, Some(Path::new("/home/ada")), 1000)?;
    assert_eq!(cfg.store_path, Path::new("/home/ada/state/jobs.db"));
    assert_eq!(cfg.log_path, Path::new("/var/tmp/tqd.log"));
    assert_eq!(cfg.pid_path, Path::new("/home/ada/state/tqd.pid"));
    assert_eq!(cfg.capacity, 4);
    assert_eq!(cfg.tick_interval, Duration::from_millis(250));
    assert_eq!(cfg.sweep_interval_ticks, 0);
    assert_eq!(cfg.output_sinks().stdout_path(Path::new("/w")), Path::new("/w/job.out"));
    Ok(())
}

#[test]
fn invalid_values_are_rejected() {
    let home = Some(Path::new("/home/ada"));
    let bad = [
        "[scheduler]\ncapacity = 0",
        "[scheduler]\ntick_interval_ms = 0",
        "[output]\nstdout_file = \"\"",
        "[output]\nstderr_file = \"logs/err\"",
        "[output]\nstdout_file = \"same\"\nstderr_file = \"same\"",
        "[paths]\nstore = \"/tmp/x\"\nlog = \"/tmp/x\"",
    ];
    for src in bad {
        let err = resolve_config(parse(src), home, 1000).unwrap_err();
        assert!(matches!(err, TaskqError::ConfigError(_)), "{src:?} gave {err}");
    }
}

#[test]
fn missing_home_needs_explicit_paths() -> TestResult {
    let err = resolve_config(RawConfigFile::default(), None, 1000).unwrap_err();
    assert!(matches!(err, TaskqError::ConfigError(_)));

    let raw = parse("[paths]\nstore = \"/s/db\"\nlog = \"/s/log\"\npid_file = \"/s/pid\"");
    let cfg = resolve_config(raw, None, 1000)?;
    assert_eq!(cfg.store_path, Path::new("/s/db"));
    Ok(())
}

#[test]
fn unknown_keys_are_an_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("tq.toml");
    std::fs::write(&path, "[scheduler]\ncapacty = 3\n")?;
    assert!(matches!(load_from_path(&path), Err(TaskqError::TomlError(_))));
    Ok(())
}

#[test]
fn load_and_validate_reads_a_file() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("tq.toml");
    let state = dir.path().join("state");
    std::fs::write(
        &path,
        format!(
            "[paths]\nstore = \"{0}/db\"\nlog = \"{0}/log\"\npid_file = \"{0}/pid\"\n[scheduler]\ncapacity = 3\n",
            state.display()
        ),
    )?;
    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.capacity, 3);
    assert_eq!(cfg.store_path, state.join("db"));
    Ok(())
}
