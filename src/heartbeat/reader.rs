//! Heartbeat file parsing
//!
//! Reads the liveness records that monitored processes rewrite on every
//! poll tick. A heartbeat that is missing, corrupt, or incomplete is
//! reported as absent, never as an error: "no heartbeat yet" is a
//! legitimate steady-state condition for a process that never started.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed heartbeat record
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatRecord {
    /// Stable identity of the process that wrote the record
    pub process_key: String,

    /// PID the process reported for itself
    pub pid: i32,

    /// Emission instant (timezone-aware)
    pub timestamp: DateTime<Utc>,

    /// Free-form status tag (e.g. "running", "error")
    pub status: String,

    /// Monotonically increasing poll-loop counter
    pub iteration: u64,

    /// Path the record was read from
    pub file_path: PathBuf,
}

/// Read and parse a heartbeat JSON file.
///
/// Returns `None` if the file is missing, is not valid JSON, lacks any
/// of the five required fields, or carries a timestamp that is not a
/// timezone-aware RFC 3339 instant.
pub fn read_heartbeat(path: &Path) -> Option<HeartbeatRecord> {
    let raw = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;

    let process_key = value.get("process_key")?.as_str()?.to_string();
    let pid = i32::try_from(value.get("pid")?.as_i64()?).ok()?;
    let timestamp = DateTime::parse_from_rfc3339(value.get("timestamp")?.as_str()?)
        .ok()?
        .with_timezone(&Utc);
    let status = value.get("status")?.as_str()?.to_string();
    let iteration = value.get("iteration")?.as_u64()?;

    Some(HeartbeatRecord {
        process_key,
        pid,
        timestamp,
        status,
        iteration,
        file_path: path.to_path_buf(),
    })
}

/// Read all `.json` heartbeat files in a directory, keyed by file name.
///
/// Corrupt or incomplete files are skipped.
#[allow(dead_code)] // Public API for bulk heartbeat inspection
pub fn read_all_heartbeats(dir: &Path) -> BTreeMap<String, HeartbeatRecord> {
    let mut results = BTreeMap::new();

    let Ok(entries) = fs::read_dir(dir) else {
        return results;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(record) = read_heartbeat(&path) {
            results.insert(name.to_string(), record);
        }
    }

    results
}
