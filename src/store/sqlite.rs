// src/store/sqlite.rs

//! SQLite-backed [`JobStore`].
//!
//! A fresh connection is opened for every operation so that the daemon and
//! any number of short-lived client processes can share the file; SQLite's
//! own locking (plus a busy timeout) serialises the writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::store::{JobFilter, JobOrder, JobStore, JobUpdate, Precondition};
use crate::types::{Job, JobId, JobStatus, NewJob};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    worker_pid INTEGER,
    working_directory TEXT NOT NULL,
    command TEXT NOT NULL,
    exit_code INTEGER,
    start_time REAL,
    end_time REAL,
    priority INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 10,
    CHECK (worker_pid IS NULL OR exit_code IS NULL)
);";

const COLUMNS: &str =
    "id, worker_pid, working_directory, command, exit_code, start_time, end_time, priority, weight";

#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    path: PathBuf,
}

impl SqliteJobStore {
    /// Open (or create) the store at `path`.
    ///
    /// A file that SQLite does not recognise as a database is moved aside to
    /// `<path>.corrupt` and replaced by an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        match store.install_schema() {
            Ok(()) => Ok(store),
            Err(err) if is_corruption(&err) => {
                let aside = corrupt_path(&store.path);
                warn!(
                    path = %store.path.display(),
                    moved_to = %aside.display(),
                    error = %err,
                    "job store is not a valid database; starting with an empty store"
                );
                std::fs::rename(&store.path, &aside)?;
                store.install_schema()?;
                Ok(store)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn install_schema(&self) -> rusqlite::Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
    }
}

impl JobStore for SqliteJobStore {
    fn insert(&self, job: &NewJob) -> Result<JobId> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO jobs(working_directory, command, priority, weight) VALUES (?1, ?2, ?3, ?4)",
            params![
                job.working_directory.to_string_lossy(),
                job.command,
                job.priority,
                job.weight,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(job_id = id, command = %job.command, "inserted job");
        Ok(id)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>> {
        let conn = self.connect()?;
        let job = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn update(&self, id: JobId, update: &JobUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(pid) = update.worker_pid {
            sets.push("worker_pid = ?");
            values.push(pid.map(Value::Integer).unwrap_or(Value::Null));
        }
        if let Some(code) = update.exit_code {
            sets.push("exit_code = ?");
            values.push(code.map(|c| Value::Integer(c.into())).unwrap_or(Value::Null));
        }
        if let Some(t) = update.start_time {
            sets.push("start_time = ?");
            values.push(t.map(Value::Real).unwrap_or(Value::Null));
        }
        if let Some(t) = update.end_time {
            sets.push("end_time = ?");
            values.push(t.map(Value::Real).unwrap_or(Value::Null));
        }
        if let Some(p) = update.priority {
            sets.push("priority = ?");
            values.push(Value::Integer(p));
        }
        if let Some(w) = update.weight {
            sets.push("weight = ?");
            values.push(Value::Integer(w.into()));
        }

        values.push(Value::Integer(id));
        let guard = precondition_clause(update.precondition, &mut values);

        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ? AND ({guard})",
            sets.join(", ")
        );
        let conn = self.connect()?;
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        debug!(job_id = id, changed, ?update, "updated job");
        Ok(changed > 0)
    }

    fn query(&self, filter: &JobFilter, order: JobOrder) -> Result<Vec<Job>> {
        let order_by = match order {
            JobOrder::Id => "id ASC",
            JobOrder::Admission => "priority DESC, id ASC",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM jobs WHERE {} ORDER BY {order_by}",
            filter_clause(filter)
        );

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(job_from_row(row)?);
        }
        Ok(out)
    }

    fn delete(&self, id: JobId, precondition: Precondition) -> Result<bool> {
        let mut values = vec![Value::Integer(id)];
        let guard = precondition_clause(precondition, &mut values);
        let conn = self.connect()?;
        let removed = conn.execute(
            &format!("DELETE FROM jobs WHERE id = ? AND ({guard})"),
            params_from_iter(values.iter()),
        )?;
        Ok(removed > 0)
    }

    fn delete_where(&self, filter: &JobFilter) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute(
            &format!("DELETE FROM jobs WHERE {}", filter_clause(filter)),
            [],
        )?;
        Ok(removed)
    }
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        worker_pid: row.get(1)?,
        working_directory: PathBuf::from(row.get::<_, String>(2)?),
        command: row.get(3)?,
        exit_code: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        priority: row.get(7)?,
        weight: row.get(8)?,
    })
}

// Must agree with `JobStatus::from_columns`; -1 is `ORPHAN_PID`.
fn status_clause(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "(worker_pid IS NULL AND exit_code IS NULL)",
        JobStatus::Running => "(worker_pid IS NOT NULL AND worker_pid <> -1 AND exit_code IS NULL)",
        JobStatus::Finished => "(exit_code IS NOT NULL)",
        JobStatus::Orphaned => "(worker_pid = -1 AND exit_code IS NULL)",
    }
}

/// SQL guard for `precondition`; binds its parameters onto `values`.
fn precondition_clause(precondition: Precondition, values: &mut Vec<Value>) -> String {
    match precondition {
        Precondition::Always => "1".to_string(),
        Precondition::Pending => status_clause(JobStatus::Pending).to_string(),
        Precondition::Unfinished => "exit_code IS NULL".to_string(),
        Precondition::ClaimedBy(pid) => {
            values.push(Value::Integer(pid));
            "exit_code IS NULL AND worker_pid = ?".to_string()
        }
        Precondition::NotRunning => format!("NOT {}", status_clause(JobStatus::Running)),
    }
}

fn filter_clause(filter: &JobFilter) -> String {
    if filter.statuses.is_empty() {
        return "1".to_string();
    }
    filter
        .statuses
        .iter()
        .map(|s| status_clause(*s))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn is_corruption(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt)
    )
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}
