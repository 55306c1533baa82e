// src/daemon/mod.rs

//! Single-instance background service.
//!
//! - [`pidfile`] owns the PID-file and the stale-file cleanup.
//! - [`detach`] turns the process into a background daemon.
//! - [`signals`] converts SIGTERM/SIGINT into a cancellation token.
//!
//! [`start`] and [`stop`] are the lifecycle entry points used by the CLI;
//! [`serve`] is the scheduler wiring shared by `start` and tests.

pub mod detach;
pub mod pidfile;
pub mod signals;

use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::LogLevel;
use crate::config::DaemonConfig;
use crate::errors::{Result, TaskqError};
use crate::exec::ProcessLauncher;
use crate::logging::init_logging;
use crate::sched::{OsProcessProbe, Scheduler};
use crate::store::{JobStore, SqliteJobStore};

pub use pidfile::{PidFile, live_daemon_pid, read_pid};

/// How long `stop` waits for the daemon to remove its PID-file.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Stay attached to the terminal instead of detaching.
    pub foreground: bool,
    pub log_level: Option<LogLevel>,
}

/// Start the daemon and run the scheduler until SIGTERM/SIGINT.
///
/// Refuses to start while the PID-file names a live process. Everything that
/// can fail for configuration reasons (store, log file) is checked before
/// detaching, so the invoking terminal sees the error.
pub fn start(config: &DaemonConfig, options: StartOptions) -> Result<()> {
    if let Some(pid) = live_daemon_pid(&config.pid_path, &OsProcessProbe)? {
        return Err(TaskqError::AlreadyRunning(pid));
    }
    SqliteJobStore::open(&config.store_path)?;

    if !options.foreground {
        eprintln!("tq: starting daemon (log: {})", config.log_path.display());
        detach::detach(&config.log_path)?;
    }

    init_logging(options.log_level, tracing::Level::INFO)?;

    let pid_file = PidFile::create(&config.pid_path, std::process::id())?;
    info!(pid = pid_file.pid(), pid_file = %pid_file.path().display(), "daemon started");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async {
        let shutdown = signals::install_shutdown_handler()?;
        serve(config, shutdown).await
    });

    if let Err(err) = &result {
        warn!(error = %err, "daemon exiting with error");
    }
    info!("daemon exiting");
    drop(pid_file);
    result
}

/// Run the scheduler against the configured store until `shutdown` fires.
pub async fn serve(config: &DaemonConfig, shutdown: CancellationToken) -> Result<()> {
    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::open(&config.store_path)?);
    let launcher = ProcessLauncher::new(Arc::clone(&store), config.output_sinks());
    let scheduler = Scheduler::new(
        store,
        launcher,
        Arc::new(OsProcessProbe),
        config.scheduler_options(),
    );
    scheduler.run(shutdown).await
}

/// Ask the running daemon to terminate and wait for its PID-file to go away.
///
/// Returns the pid that was signalled.
pub fn stop(config: &DaemonConfig) -> Result<i32> {
    let Some(pid) = live_daemon_pid(&config.pid_path, &OsProcessProbe)? else {
        return Err(TaskqError::NotRunning);
    };

    kill(Pid::from_raw(pid), Signal::SIGTERM)?;
    info!(pid, "sent SIGTERM to daemon");

    let deadline = Instant::now() + STOP_TIMEOUT;
    while config.pid_path.exists() {
        if Instant::now() >= deadline {
            warn!(pid, "daemon did not remove its pid file in time");
            break;
        }
        std::thread::sleep(STOP_POLL);
    }
    Ok(pid)
}

/// Pid of the running daemon, cleaning up a stale PID-file on the way.
pub fn running_pid(config: &DaemonConfig) -> Result<Option<i32>> {
    live_daemon_pid(&config.pid_path, &OsProcessProbe)
}
