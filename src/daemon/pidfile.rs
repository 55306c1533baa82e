// src/daemon/pidfile.rs

//! PID-file handling. The file's presence is the one signal other `tq`
//! invocations use to decide whether the daemon is running.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{Result, TaskqError};
use crate::sched::ProcessProbe;

/// Owned PID-file; removed when dropped, so every exit path that unwinds
/// through the daemon's entry point cleans it up.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Create the PID-file exclusively and write `pid` into it.
    ///
    /// Fails with [`TaskqError::AlreadyRunning`] if another process created
    /// it first.
    pub fn create(path: impl AsRef<Path>, pid: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = read_pid(&path)?.unwrap_or(0);
                return Err(TaskqError::AlreadyRunning(holder));
            }
            Err(err) => return Err(err.into()),
        };
        writeln!(file, "{pid}")?;
        file.sync_all()?;

        debug!(path = %path.display(), pid, "wrote pid file");
        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Leave a file that was replaced by another instance alone.
        match read_pid(&self.path) {
            Ok(Some(pid)) if pid as u32 != self.pid => return,
            _ => {}
        }
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "failed to remove pid file");
            }
        }
    }
}

/// Read the pid recorded in a PID-file, if the file exists.
pub fn read_pid(path: impl AsRef<Path>) -> Result<Option<i32>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let pid = contents
        .trim()
        .parse::<i32>()
        .map_err(|_| TaskqError::CorruptPidFile(path.to_path_buf()))?;
    Ok(Some(pid))
}

/// Pid of the running daemon according to the PID-file.
///
/// A PID-file naming a process that no longer exists (or holding garbage)
/// is stale: it is removed and `None` is returned.
pub fn live_daemon_pid(path: impl AsRef<Path>, probe: &dyn ProcessProbe) -> Result<Option<i32>> {
    let path = path.as_ref();
    let pid = match read_pid(path) {
        Ok(Some(pid)) => pid,
        Ok(None) => return Ok(None),
        Err(TaskqError::CorruptPidFile(_)) => {
            warn!(path = %path.display(), "removing unreadable pid file");
            remove_if_present(path)?;
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    if probe.is_alive(i64::from(pid)) {
        return Ok(Some(pid));
    }

    warn!(path = %path.display(), pid, "removing stale pid file");
    remove_if_present(path)?;
    Ok(None)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
