// src/daemon/detach.rs

//! Classic double-fork detach from the controlling terminal.
//!
//! Must run before the Tokio runtime (or any other thread) exists.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::path::Path;

use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, chdir, dup2, fork, setsid};

use crate::errors::Result;

/// Detach into the background.
///
/// The calling process and the intermediate child exit with status 0; only
/// the grandchild returns from this function. Its stdin reads `/dev/null`,
/// stdout/stderr append to `log_path`, its cwd is `/` and its umask is 0.
pub fn detach(log_path: &Path) -> Result<()> {
    // Open the sinks first so a bad log path is reported to the caller.
    let devnull = OpenOptions::new().read(true).open("/dev/null")?;
    let log = OpenOptions::new().create(true).append(true).open(log_path)?;

    // SAFETY: no other threads exist yet, so the child cannot inherit a
    // lock held by a thread that is not forked along with it.
    if let ForkResult::Parent { .. } = unsafe { fork() }? {
        std::process::exit(0);
    }

    setsid()?;

    // SAFETY: same as above; still single-threaded.
    if let ForkResult::Parent { .. } = unsafe { fork() }? {
        std::process::exit(0);
    }

    chdir("/")?;
    umask(Mode::empty());

    dup2(devnull.as_raw_fd(), std::io::stdin().as_raw_fd())?;
    dup2(log.as_raw_fd(), std::io::stdout().as_raw_fd())?;
    dup2(log.as_raw_fd(), std::io::stderr().as_raw_fd())?;

    Ok(())
}
