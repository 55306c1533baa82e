// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running job commands, using
//! `tokio::process::Command`, and writing their outcome back to the store.
//!
//! - [`supervisor`] runs a single job in its own child process.
//! - [`output`] appends captured stdout/stderr to per-directory files.
//! - [`backend`] provides the `Launcher` trait and the `ProcessLauncher`
//!   the scheduler uses in production, and which tests can replace with a
//!   fake implementation.

pub mod backend;
pub mod output;
pub mod supervisor;

pub use backend::{Launcher, ProcessLauncher};
pub use output::OutputSinks;
pub use supervisor::{WorkerReport, WorkerSupervisor};
