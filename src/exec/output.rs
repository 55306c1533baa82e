// src/exec/output.rs

//! Per-directory output sinks.
//!
//! Every job that ran in a given working directory appends to the same pair
//! of files there (`tq.out` / `tq.err` by default).

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSinks {
    pub stdout_file: String,
    pub stderr_file: String,
}

impl OutputSinks {
    pub fn new(stdout_file: impl Into<String>, stderr_file: impl Into<String>) -> Self {
        Self {
            stdout_file: stdout_file.into(),
            stderr_file: stderr_file.into(),
        }
    }

    pub fn stdout_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.stdout_file)
    }

    pub fn stderr_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.stderr_file)
    }

    /// Append captured streams verbatim. Empty streams leave the files alone.
    pub async fn append(&self, dir: &Path, stdout: &[u8], stderr: &[u8]) -> Result<()> {
        append_bytes(&self.stdout_path(dir), stdout).await?;
        append_bytes(&self.stderr_path(dir), stderr).await?;
        Ok(())
    }
}

async fn append_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
