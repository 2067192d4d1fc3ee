//! Health verdicts for monitored processes
//!
//! Combines the heartbeat reader and the PID liveness probe into a
//! per-process verdict, plus a batch report over all enabled processes.

use crate::config::{ProcessSpec, VigilConfig};
use crate::heartbeat::read_heartbeat;
use crate::probe::is_pid_alive;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health verdict for a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessHealth {
    /// Fresh heartbeat and a live PID
    Healthy,
    /// Heartbeat present but older than the configured timeout
    TimedOut,
    /// Heartbeat file absent, corrupt, or incomplete
    NoHeartbeat,
    /// Heartbeat present but the recorded PID is not running
    StalePid,
}

impl ProcessHealth {
    /// Stable string form, as stored in the failure store
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessHealth::Healthy => "healthy",
            ProcessHealth::TimedOut => "timed_out",
            ProcessHealth::NoHeartbeat => "no_heartbeat",
            ProcessHealth::StalePid => "stale_pid",
        }
    }
}

impl std::fmt::Display for ProcessHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of checking one process
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Process key
    pub process_key: String,
    /// Display name from the config
    pub display_name: String,
    /// Health verdict
    pub health: ProcessHealth,
    /// PID from the heartbeat, if one was read
    pub pid: Option<i32>,
    /// Heartbeat emission instant, if one was read
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Seconds since the last heartbeat, if one was read
    pub elapsed_seconds: Option<f64>,
    /// Poll-loop iteration from the heartbeat, if one was read
    pub iteration: Option<u64>,
    /// Configured timeout the verdict was judged against
    pub timeout_seconds: u64,
}

/// Aggregated results of one check cycle
#[derive(Debug, Serialize)]
pub struct MonitorReport {
    /// When the cycle ran
    pub timestamp: DateTime<Utc>,
    /// Per-process results, in config key order
    pub results: Vec<CheckResult>,
}

impl MonitorReport {
    pub fn processes_checked(&self) -> usize {
        self.results.len()
    }

    pub fn processes_healthy(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.health == ProcessHealth::Healthy)
            .count()
    }

    pub fn processes_unhealthy(&self) -> usize {
        self.processes_checked() - self.processes_healthy()
    }
}

/// Check a single process's health via its heartbeat file.
///
/// The PID check takes precedence over staleness: a dead process with
/// an old-but-not-yet-timed-out heartbeat is still `StalePid`.
pub fn check_process(process_key: &str, spec: &ProcessSpec) -> CheckResult {
    let heartbeat = spec
        .heartbeat_path
        .as_deref()
        .and_then(read_heartbeat);

    let Some(heartbeat) = heartbeat else {
        return CheckResult {
            process_key: process_key.to_string(),
            display_name: spec.display_name.clone(),
            health: ProcessHealth::NoHeartbeat,
            pid: None,
            last_heartbeat: None,
            elapsed_seconds: None,
            iteration: None,
            timeout_seconds: spec.timeout_seconds,
        };
    };

    let now = Utc::now();
    let elapsed = (now - heartbeat.timestamp).num_milliseconds() as f64 / 1000.0;

    let health = if !is_pid_alive(heartbeat.pid) {
        ProcessHealth::StalePid
    } else if elapsed > spec.timeout_seconds as f64 {
        ProcessHealth::TimedOut
    } else {
        ProcessHealth::Healthy
    };

    CheckResult {
        process_key: process_key.to_string(),
        display_name: spec.display_name.clone(),
        health,
        pid: Some(heartbeat.pid),
        last_heartbeat: Some(heartbeat.timestamp),
        elapsed_seconds: Some(elapsed),
        iteration: Some(heartbeat.iteration),
        timeout_seconds: spec.timeout_seconds,
    }
}

/// Check all enabled processes. Disabled processes are never checked
/// and never counted.
pub fn check_all_processes(config: &VigilConfig) -> MonitorReport {
    let mut report = MonitorReport {
        timestamp: Utc::now(),
        results: Vec::new(),
    };

    for (key, spec) in config.enabled_processes() {
        report.results.push(check_process(key, spec));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn spec_with_heartbeat(path: &Path, timeout: u64) -> ProcessSpec {
        let toml_str = format!(
            r#"
display_name = "Test Process"
timeout_seconds = {timeout}
enabled = true
heartbeat_path = "{}"
recovery_actions = ["kill"]
"#,
            path.display()
        );
        toml::from_str(&toml_str).unwrap()
    }

    fn write_heartbeat(path: &Path, pid: i32, age_seconds: i64) {
        let ts = Utc::now() - Duration::seconds(age_seconds);
        let body = serde_json::json!({
            "process_key": "test",
            "pid": pid,
            "timestamp": ts.to_rfc3339(),
            "status": "running",
            "iteration": 5,
        });
        fs::write(path, body.to_string()).unwrap();
    }

    fn own_pid() -> i32 {
        std::process::id() as i32
    }

    #[test]
    fn test_missing_file_is_no_heartbeat() {
        let dir = TempDir::new().unwrap();
        let spec = spec_with_heartbeat(&dir.path().join("absent.json"), 60);

        let result = check_process("test", &spec);
        assert_eq!(result.health, ProcessHealth::NoHeartbeat);
        assert_eq!(result.pid, None);
        assert_eq!(result.elapsed_seconds, None);
        assert_eq!(result.timeout_seconds, 60);
    }

    #[test]
    fn test_fresh_heartbeat_live_pid_is_healthy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hb.json");
        write_heartbeat(&path, own_pid(), 1);

        let result = check_process("test", &spec_with_heartbeat(&path, 60));
        assert_eq!(result.health, ProcessHealth::Healthy);
        assert_eq!(result.pid, Some(own_pid()));
        assert_eq!(result.iteration, Some(5));
    }

    #[test]
    fn test_stale_heartbeat_live_pid_is_timed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hb.json");
        write_heartbeat(&path, own_pid(), 120);

        let result = check_process("test", &spec_with_heartbeat(&path, 60));
        assert_eq!(result.health, ProcessHealth::TimedOut);
        assert!(result.elapsed_seconds.unwrap() > 60.0);
    }

    #[test]
    fn test_dead_pid_dominates_staleness() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hb.json");

        // Fresh heartbeat, dead PID.
        write_heartbeat(&path, 4_000_000, 1);
        let result = check_process("test", &spec_with_heartbeat(&path, 60));
        assert_eq!(result.health, ProcessHealth::StalePid);

        // Stale heartbeat, dead PID: still StalePid, not TimedOut.
        write_heartbeat(&path, 4_000_000, 120);
        let result = check_process("test", &spec_with_heartbeat(&path, 60));
        assert_eq!(result.health, ProcessHealth::StalePid);
    }

    #[test]
    fn test_batch_skips_disabled_processes() {
        let dir = TempDir::new().unwrap();
        let hb = dir.path().join("on.json");
        write_heartbeat(&hb, own_pid(), 1);

        let toml_str = format!(
            r#"
[processes.enabled_proc]
display_name = "On"
enabled = true
heartbeat_path = "{}"
recovery_actions = ["kill"]

[processes.disabled_proc]
display_name = "Off"
enabled = false
heartbeat_path = "{}"
recovery_actions = ["kill"]
"#,
            hb.display(),
            dir.path().join("off.json").display()
        );
        let mut config: VigilConfig = toml::from_str(&toml_str).unwrap();
        config.normalize();

        let report = check_all_processes(&config);
        assert_eq!(report.processes_checked(), 1);
        assert_eq!(report.results[0].process_key, "enabled_proc");
        assert_eq!(report.processes_healthy(), 1);
        assert_eq!(report.processes_unhealthy(), 0);
    }

    #[test]
    fn test_health_display() {
        assert_eq!(ProcessHealth::Healthy.to_string(), "healthy");
        assert_eq!(ProcessHealth::TimedOut.to_string(), "timed_out");
        assert_eq!(ProcessHealth::NoHeartbeat.to_string(), "no_heartbeat");
        assert_eq!(ProcessHealth::StalePid.to_string(), "stale_pid");
    }
}
