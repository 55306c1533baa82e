// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod render;
pub mod sched;
pub mod store;
pub mod types;

use tracing::{debug, warn};

use crate::cli::{CliArgs, Command, fold_assignments};
use crate::config::{DaemonConfig, load_effective};
use crate::daemon::StartOptions;
use crate::errors::Result;
use crate::sched::OsProcessProbe;
use crate::store::SqliteJobStore;
use crate::types::{DEFAULT_PRIORITY, DEFAULT_WEIGHT, NewJob, now_epoch_secs};

/// High-level entry point used by `main.rs`.
///
/// Resolves the configuration and dispatches to the daemon lifecycle or to
/// one of the client operations. Everything except `start` expects logging
/// to be initialised already.
pub fn run(args: CliArgs) -> Result<()> {
    let config = load_effective(args.config.as_deref())?;
    debug!(?config, "effective configuration");

    match args.command {
        Command::Start { foreground } => daemon::start(
            &config,
            StartOptions {
                foreground,
                log_level: args.log_level,
            },
        ),
        Command::Stop => {
            let pid = daemon::stop(&config)?;
            println!("stopped daemon (pid {pid})");
            Ok(())
        }
        Command::Status => {
            let store = SqliteJobStore::open(&config.store_path)?;
            let pid = daemon::running_pid(&config)?;
            let report = client::status(&store, &OsProcessProbe, config.capacity, pid)?;
            print!("{}", render::render_status(&report));
            Ok(())
        }
        Command::Submit {
            priority,
            weight,
            command,
        } => submit(&config, priority, weight, &command),
        Command::List => {
            let store = SqliteJobStore::open(&config.store_path)?;
            let jobs = client::list(&store, &OsProcessProbe)?;
            print!("{}", render::render_jobs(&jobs, now_epoch_secs()));
            Ok(())
        }
        Command::Remove { id } => {
            let store = SqliteJobStore::open(&config.store_path)?;
            client::remove(&store, id)?;
            println!("removed job {id}");
            Ok(())
        }
        Command::Edit { id, assignments } => {
            let (priority, weight) = fold_assignments(&assignments);
            let store = SqliteJobStore::open(&config.store_path)?;
            let job = client::edit(&store, id, priority, weight)?;
            println!(
                "job {id}: priority {} weight {}",
                job.priority, job.weight
            );
            Ok(())
        }
        Command::Clean => {
            let store = SqliteJobStore::open(&config.store_path)?;
            let removed = client::clean(&store)?;
            println!("removed {removed} job(s)");
            Ok(())
        }
        Command::Purge => {
            let pid = daemon::running_pid(&config)?;
            let report = client::purge(&config, pid)?;
            println!("removed {} job(s)", report.removed_jobs);
            for path in &report.removed_files {
                println!("deleted {}", path.display());
            }
            if pid.is_some() {
                println!("daemon is running; store and log kept");
            }
            Ok(())
        }
    }
}

fn submit(
    config: &DaemonConfig,
    priority: Option<i64>,
    weight: Option<u32>,
    command: &[String],
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let job = NewJob::new(cwd, cli::join_command(command)?)
        .with_priority(priority.unwrap_or(DEFAULT_PRIORITY))
        .with_weight(weight.unwrap_or(DEFAULT_WEIGHT));

    let store = SqliteJobStore::open(&config.store_path)?;
    let id = client::submit(&store, &job)?;
    println!("{id}");

    if daemon::running_pid(config)?.is_none() {
        warn!(job_id = id, "daemon is not running; the job waits until `tq start`");
    }
    Ok(())
}
