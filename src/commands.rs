//! Per-process command handlers
//!
//! The on/off/restart operations behind both the CLI subcommands and
//! the dashboard keybindings. Core operations return `(success,
//! message)` so the dashboard can surface them as notifications; the
//! `handle_*` wrappers map them to process exit codes.

use crate::config::{ProcessSpec, VigilConfig};
use crate::error::Result;
use crate::heartbeat::read_heartbeat;
use crate::monitor::check_all_processes;
use crate::recovery::{RecoveryOptions, kill_process, run_recovery, spawn_detached};
use tracing::{error, info, warn};

/// Start a process via its configured start command.
pub fn start_process(key: &str, spec: &ProcessSpec, opts: &RecoveryOptions) -> (bool, String) {
    let Some(command) = spec.commands.get("start") else {
        return (false, format!("No start command for {key}"));
    };

    let result = spawn_detached(command, opts.verify_delay);
    if result.success {
        let pid = result.pid.map_or_else(|| "?".to_string(), |p| p.to_string());
        (true, format!("Started {key} (PID {pid})"))
    } else {
        let detail = result.error.unwrap_or_else(|| "unknown error".to_string());
        (false, format!("Failed to start {key}: {detail}"))
    }
}

/// Kill a process, locating its PID via the heartbeat file.
///
/// An absent heartbeat means there is nothing to kill; that is a
/// success, not an error.
pub fn kill_by_key(key: &str, spec: &ProcessSpec, opts: &RecoveryOptions) -> (bool, String) {
    let heartbeat = spec.heartbeat_path.as_deref().and_then(read_heartbeat);
    let Some(heartbeat) = heartbeat else {
        return (true, format!("No heartbeat for {key}, nothing to kill"));
    };

    let result = kill_process(heartbeat.pid, opts.kill_timeout);
    if result.success {
        (true, format!("Killed {key} (PID {})", heartbeat.pid))
    } else {
        let detail = result.error.unwrap_or_else(|| "unknown error".to_string());
        (false, format!("Failed to kill {key}: {detail}"))
    }
}

/// Run the full recovery pipeline for a process.
pub fn restart_by_key(key: &str, spec: &ProcessSpec, opts: &RecoveryOptions) -> (bool, String) {
    let pid = spec
        .heartbeat_path
        .as_deref()
        .and_then(read_heartbeat)
        .map(|hb| hb.pid);

    let outcome = run_recovery(key, pid, spec, opts);
    if outcome.fully_recovered {
        (true, format!("Restarted {key}"))
    } else {
        let stage = outcome.stage_failed.as_deref().unwrap_or("unknown");
        (false, format!("Restart of {key} failed at '{stage}'"))
    }
}

/// `on <key>`: start one process
pub fn handle_on(config: &VigilConfig, key: &str) -> i32 {
    let Some(spec) = config.process(key) else {
        error!("Unknown process: {key}");
        return 2;
    };

    let (ok, message) = start_process(key, spec, &RecoveryOptions::from(&config.config));
    if ok {
        info!("{message}");
        0
    } else {
        error!("{message}");
        1
    }
}

/// `off <key>`: stop one process via its heartbeat PID
pub fn handle_off(config: &VigilConfig, key: &str) -> i32 {
    let Some(spec) = config.process(key) else {
        error!("Unknown process: {key}");
        return 2;
    };

    let (ok, message) = kill_by_key(key, spec, &RecoveryOptions::from(&config.config));
    if ok {
        info!("{message}");
        0
    } else {
        error!("{message}");
        1
    }
}

/// `restart <key>`: run the configured recovery actions
pub fn handle_restart(config: &VigilConfig, key: &str) -> i32 {
    let Some(spec) = config.process(key) else {
        error!("Unknown process: {key}");
        return 2;
    };

    let (ok, message) = restart_by_key(key, spec, &RecoveryOptions::from(&config.config));
    if ok {
        info!("{message}");
        0
    } else {
        warn!("{message}");
        1
    }
}

/// `start-all`: start every enabled process
pub fn handle_start_all(config: &VigilConfig) -> i32 {
    let mut any_failed = false;
    for (key, _) in config.enabled_processes() {
        if handle_on(config, key) != 0 {
            any_failed = true;
        }
    }
    if any_failed { 1 } else { 0 }
}

/// `stop-all`: stop every enabled process
pub fn handle_stop_all(config: &VigilConfig) -> i32 {
    let mut any_failed = false;
    for (key, _) in config.enabled_processes() {
        if handle_off(config, key) != 0 {
            any_failed = true;
        }
    }
    if any_failed { 1 } else { 0 }
}

/// `status`: one-shot health report over all enabled processes
pub fn handle_status(config: &VigilConfig, json: bool) -> Result<i32> {
    let report = check_all_processes(config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        println!(
            "{:<20} {:<24} {:<14} {:>8} {:>10} {:>9}",
            "KEY", "NAME", "HEALTH", "PID", "ELAPSED", "TIMEOUT"
        );
        for result in &report.results {
            println!(
                "{:<20} {:<24} {:<14} {:>8} {:>10} {:>9}",
                result.process_key,
                result.display_name,
                result.health.to_string(),
                result.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
                result
                    .elapsed_seconds
                    .map_or_else(|| "-".to_string(), |e| format!("{e:.0}s")),
                format!("{}s", result.timeout_seconds),
            );
        }
        println!(
            "\n{} checked, {} healthy, {} unhealthy (at {})",
            report.processes_checked(),
            report.processes_healthy(),
            report.processes_unhealthy(),
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(if report.processes_unhealthy() > 0 { 1 } else { 0 })
}
