//! Heartbeat writer for monitored processes
//!
//! This is the producer side of the heartbeat contract, meant to be
//! embedded in the long-running processes Vigil supervises. It has no
//! dependency on the rest of the supervisor.
//!
//! ```ignore
//! let mut writer = HeartbeatWriter::new("/var/run/heartbeats", "worker");
//! loop {
//!     writer.beat()?;
//!     // ... one unit of work ...
//! }
//! // on clean shutdown:
//! writer.stop()?;
//! ```

use crate::error::Result;
use chrono::Utc;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Writes heartbeat files for process health monitoring
#[derive(Debug)]
#[allow(dead_code)] // Producer-side library, embedded by monitored processes
pub struct HeartbeatWriter {
    dir: PathBuf,
    process_key: String,
    path: PathBuf,
    iteration: u64,
}

#[allow(dead_code)] // Producer-side library, embedded by monitored processes
impl HeartbeatWriter {
    /// Create a writer that emits `<dir>/<process_key>.json`
    pub fn new(heartbeat_dir: impl Into<PathBuf>, process_key: &str) -> Self {
        let dir = heartbeat_dir.into();
        let path = dir.join(format!("{process_key}.json"));
        Self {
            dir,
            process_key: process_key.to_string(),
            path,
            iteration: 0,
        }
    }

    /// Create a writer with an explicit file name under `dir`
    pub fn with_filename(heartbeat_dir: impl Into<PathBuf>, process_key: &str, filename: &str) -> Self {
        let dir = heartbeat_dir.into();
        let path = dir.join(filename);
        Self {
            dir,
            process_key: process_key.to_string(),
            path,
            iteration: 0,
        }
    }

    /// Write a heartbeat. Call this on every polling iteration.
    ///
    /// The record is written to a temp file in the same directory and
    /// renamed into place, so readers never observe a partial record.
    pub fn beat(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.iteration += 1;

        let record = serde_json::json!({
            "process_key": self.process_key,
            "pid": std::process::id(),
            "timestamp": Utc::now().to_rfc3339(),
            "status": "running",
            "iteration": self.iteration,
        });
        let body = serde_json::to_string(&record)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Remove the heartbeat file on clean shutdown.
    ///
    /// A file that is already gone is not an error.
    pub fn stop(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Path of the heartbeat file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of heartbeats written so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}
