// src/config/mod.rs

//! Configuration loading and validation for the `tq` daemon.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve default paths and validate values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{CONFIG_ENV, load_and_validate, load_effective, load_from_path};
pub use model::{DaemonConfig, OutputSection, PathsSection, RawConfigFile, SchedulerSection};
pub use validate::resolve_config;
