// src/sched/mod.rs

//! Scheduling: admission policy, liveness sweep and the tick loop.
//!
//! - [`admission`] decides which pending job may start given the capacity
//!   left by running jobs. It is pure and has no IO.
//! - [`sweep`] detects running rows whose worker process is gone.
//! - [`scheduler`] is the daemon's control loop tying both to the store and
//!   the launcher.

pub mod admission;
pub mod scheduler;
pub mod sweep;

pub use scheduler::{Scheduler, SchedulerOptions, TickOutcome};
pub use sweep::{OsProcessProbe, ProcessProbe, sweep_orphans};
