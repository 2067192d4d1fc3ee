//! Configuration file parsing for Vigil
//!
//! Parses `vigil.toml` using serde. Legacy flat-format process entries
//! (`startup_command` / `cleanup_script` / `heartbeat_filename`) are
//! folded into the canonical `commands` / `recovery_actions` /
//! `heartbeat_path` shape once at load; nothing downstream ever sees
//! the old shape.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Action names with built-in pipeline semantics (not looked up in
/// the per-process commands map, except `start` which requires one)
pub const BUILTIN_ACTIONS: &[&str] = &["kill", "start"];

/// Load configuration from a file
pub fn load(path: &Path) -> Result<VigilConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: VigilConfig = toml::from_str(&content)?;
    config.normalize();

    Ok(config)
}

/// Save configuration back to a file.
///
/// Used by the dashboard to persist enable/disable toggles. The saved
/// document is the canonical (normalized) shape.
pub fn save(config: &VigilConfig, path: &Path) -> Result<()> {
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(())
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VigilConfig {
    /// Global settings
    #[serde(default)]
    pub config: GlobalConfig,

    /// Monitored processes, keyed by stable process key
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessSpec>,
}

impl VigilConfig {
    /// Fold legacy fields into the canonical shape for every process
    pub fn normalize(&mut self) {
        let heartbeat_dir = self.config.heartbeat_dir.clone();
        for spec in self.processes.values_mut() {
            spec.normalize(&heartbeat_dir);
        }
    }

    /// Validate the configuration. Returns all problems found; an empty
    /// list means the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, spec) in &self.processes {
            if spec.display_name.is_empty() {
                errors.push(format!("Process '{key}' has an empty display_name"));
            }
            if spec.heartbeat_path.is_none() {
                errors.push(format!("Process '{key}' has no heartbeat_path"));
            }
            for action in &spec.recovery_actions {
                if action == "start" && !spec.commands.contains_key("start") {
                    errors.push(format!(
                        "Process '{key}' lists recovery action 'start' but has no 'start' command"
                    ));
                } else if !BUILTIN_ACTIONS.contains(&action.as_str())
                    && !spec.commands.contains_key(action)
                {
                    errors.push(format!(
                        "Process '{key}' recovery action '{action}' has no matching command"
                    ));
                }
            }
        }

        errors
    }

    /// Get a process spec by key
    pub fn process(&self, key: &str) -> Option<&ProcessSpec> {
        self.processes.get(key)
    }

    /// Iterate enabled processes in key order
    pub fn enabled_processes(&self) -> impl Iterator<Item = (&str, &ProcessSpec)> {
        self.processes
            .iter()
            .filter(|(_, spec)| spec.enabled)
            .map(|(key, spec)| (key.as_str(), spec))
    }
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Path of the SQLite failure store
    pub db_path: PathBuf,

    /// Path of the single-instance lock file
    pub lock_path: PathBuf,

    /// Log level filter (overridable via RUST_LOG)
    pub log_level: String,

    /// Directory for daily log files
    pub log_dir: PathBuf,

    /// Default directory for heartbeat files (used when a legacy entry
    /// only names a heartbeat_filename)
    pub heartbeat_dir: PathBuf,

    /// Unhealthy checks in a row before recovery triggers
    pub consecutive_failures_threshold: u32,

    /// Seconds to wait for SIGTERM before escalating to SIGKILL
    pub kill_timeout_seconds: u64,

    /// Seconds before a cleanup script is considered hung
    pub cleanup_timeout_seconds: u64,

    /// Seconds to wait after a start before verifying the child lives
    pub verify_delay_seconds: u64,

    /// Arguments passed to every cleanup script
    pub cleanup_args: Vec<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("vigil.db"),
            lock_path: PathBuf::from("/tmp/vigil.lock"),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            heartbeat_dir: PathBuf::from("heartbeats"),
            consecutive_failures_threshold: 2,
            kill_timeout_seconds: 10,
            cleanup_timeout_seconds: 60,
            verify_delay_seconds: 2,
            cleanup_args: vec!["--force".to_string()],
        }
    }
}

/// A monitored process definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessSpec {
    /// Human-readable name for logs and the dashboard
    pub display_name: String,

    /// Seconds of heartbeat silence before the process counts as timed out
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Whether the check cycle monitors this process
    #[serde(default)]
    pub enabled: bool,

    /// Heartbeat file path. Always set after normalization for valid
    /// configs; a missing path is a validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_path: Option<PathBuf>,

    /// Ordered recovery actions to run when the failure threshold is crossed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery_actions: Vec<String>,

    /// Actions temporarily switched off (dashboard toggle)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_actions: Vec<String>,

    // Legacy flat-format fields, consumed by normalize()
    #[serde(default, skip_serializing_if = "Option::is_none")]
    startup_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cleanup_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heartbeat_filename: Option<String>,

    /// Named commands: `start` plus any named cleanup scripts.
    /// Declared last so the serialized form keeps plain values ahead
    /// of the nested table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, String>,
}

fn default_timeout_seconds() -> u64 {
    300
}

impl ProcessSpec {
    /// Fold legacy fields into the canonical shape
    fn normalize(&mut self, heartbeat_dir: &Path) {
        if let Some(cmd) = self.startup_command.take() {
            self.commands.entry("start".to_string()).or_insert(cmd);
        }

        let migrated_cleanup = self.cleanup_script.take();
        if let Some(script) = migrated_cleanup.clone() {
            self.commands.entry("clear_db".to_string()).or_insert(script);
        }

        if let Some(filename) = self.heartbeat_filename.take() {
            self.heartbeat_path
                .get_or_insert_with(|| heartbeat_dir.join(filename));
        }

        // Legacy entries ran a fixed kill -> clean -> restart pipeline;
        // new-format entries default to kill -> start.
        if self.recovery_actions.is_empty() {
            let defaults: &[&str] = if migrated_cleanup.is_some() {
                &["kill", "clear_db", "start"]
            } else {
                &["kill", "start"]
            };
            self.recovery_actions = defaults.iter().map(|s| s.to_string()).collect();
        }
    }

    /// Configured recovery actions minus disabled ones, order preserved
    pub fn effective_recovery_actions(&self) -> Vec<String> {
        self.recovery_actions
            .iter()
            .filter(|a| !self.disabled_actions.contains(a))
            .cloned()
            .collect()
    }

    /// Toggle an action in/out of the disabled set
    pub fn toggle_action(&mut self, action: &str) {
        if let Some(pos) = self.disabled_actions.iter().position(|a| a == action) {
            self.disabled_actions.remove(pos);
        } else {
            self.disabled_actions.push(action.to_string());
        }
    }
}
