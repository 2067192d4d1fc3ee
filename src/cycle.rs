//! The cron-mode check cycle
//!
//! One sequential pass over all enabled processes: verdict, failure
//! accounting, and recovery for processes at or past the threshold.
//! The whole cycle runs under the single-instance lock; successive
//! timer-driven runs share state only through the failure store.

use crate::config::VigilConfig;
use crate::error::Result;
use crate::lock::LockHandle;
use crate::monitor::{ProcessHealth, check_all_processes};
use crate::recovery::{RecoveryOptions, run_recovery};
use crate::store::Store;
use tracing::{debug, info, warn};

/// Run a full check cycle: acquire the lock, open the store, check and
/// recover. Returns the process exit code (0 ok, 1 unrecovered).
///
/// Lock contention means another instance is already doing the work;
/// that run exits 0.
pub fn handle_check(config: &VigilConfig) -> Result<i32> {
    let Some(_lock) = LockHandle::acquire(&config.config.lock_path)? else {
        info!("another vigil instance is running, exiting");
        return Ok(0);
    };

    let mut store = Store::open(&config.config.db_path)?;
    run_checks(config, &mut store)
}

/// Check all enabled processes and recover unhealthy ones.
pub fn run_checks(config: &VigilConfig, store: &mut Store) -> Result<i32> {
    let report = check_all_processes(config);
    let threshold = config.config.consecutive_failures_threshold;
    let opts = RecoveryOptions::from(&config.config);
    let mut any_failed = false;

    for result in &report.results {
        if result.health == ProcessHealth::Healthy {
            store.record_check(
                &result.process_key,
                result.health,
                result.pid,
                result.last_heartbeat,
                result.iteration,
                None,
            )?;
            info!("{}: healthy", result.display_name);
            continue;
        }

        warn!(
            "{}: {} (PID={}, elapsed={})",
            result.display_name,
            result.health,
            result.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
            result
                .elapsed_seconds
                .map_or_else(|| "-".to_string(), |e| format!("{e:.1}s")),
        );

        let note = (threshold > 1).then_some("waiting_for_consecutive");
        let failures = store.record_check(
            &result.process_key,
            result.health,
            result.pid,
            result.last_heartbeat,
            result.iteration,
            note,
        )?;

        if failures < threshold {
            info!(
                "{}: failure {}/{}, waiting before recovery",
                result.display_name, failures, threshold
            );
            continue;
        }

        warn!(
            "{}: {} consecutive failures, triggering recovery",
            result.display_name, failures
        );

        let Some(spec) = config.process(&result.process_key) else {
            // Enabled processes come straight from the config; this
            // cannot happen, but an unrecovered process must not pass
            // silently.
            any_failed = true;
            continue;
        };

        let outcome = run_recovery(&result.process_key, result.pid, spec, &opts);
        debug!(
            "{}: recovery steps: {:?}",
            outcome.process_key,
            outcome
                .steps
                .iter()
                .map(|(name, r)| (name.as_str(), r.success()))
                .collect::<Vec<_>>()
        );
        if outcome.fully_recovered {
            info!("{}: recovered, resetting failure count", result.display_name);
            store.reset_failures(&result.process_key)?;
        } else {
            warn!(
                "{}: recovery failed at stage '{}'",
                result.display_name,
                outcome.stage_failed.as_deref().unwrap_or("unknown")
            );
            any_failed = true;
        }
    }

    info!(
        "Check complete: {} checked, {} healthy, {} unhealthy",
        report.processes_checked(),
        report.processes_healthy(),
        report.processes_unhealthy()
    );

    Ok(if any_failed { 1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_heartbeat(path: &Path, pid: i32, age_seconds: i64) {
        let ts = Utc::now() - Duration::seconds(age_seconds);
        let body = serde_json::json!({
            "process_key": "svc",
            "pid": pid,
            "timestamp": ts.to_rfc3339(),
            "status": "running",
            "iteration": 1,
        });
        fs::write(path, body.to_string()).unwrap();
    }

    /// Config with one enabled process whose start command succeeds
    /// and whose only recovery actions avoid touching real PIDs.
    fn config_for(dir: &TempDir, hb: &Path, threshold: u32, start_cmd: &str) -> VigilConfig {
        let toml_str = format!(
            r#"
[config]
db_path = "{db}"
lock_path = "{lock}"
consecutive_failures_threshold = {threshold}
verify_delay_seconds = 1

[processes.svc]
display_name = "Service"
timeout_seconds = 60
enabled = true
heartbeat_path = "{hb}"
recovery_actions = ["kill", "start"]

[processes.svc.commands]
start = "{start_cmd}"
"#,
            db = dir.path().join("vigil.db").display(),
            lock = dir.path().join("vigil.lock").display(),
            hb = hb.display(),
        );
        let mut config: VigilConfig = toml::from_str(&toml_str).unwrap();
        config.normalize();
        assert!(config.validate().is_empty());
        config
    }

    #[test]
    fn test_below_threshold_waits_then_recovers() {
        let dir = TempDir::new().unwrap();
        let hb = dir.path().join("svc.json");
        // Stale heartbeat with our own (live) PID: TimedOut. Disable
        // the kill action so recovery never signals the test process.
        write_heartbeat(&hb, std::process::id() as i32, 300);
        let mut config = config_for(&dir, &hb, 2, "sleep 5");
        config
            .processes
            .get_mut("svc")
            .unwrap()
            .disabled_actions
            .push("kill".to_string());

        let mut store = Store::open_in_memory().unwrap();

        // First timed-out check: failure 1/2, no recovery.
        let code = run_checks(&config, &mut store).unwrap();
        assert_eq!(code, 0);
        assert_eq!(store.consecutive_failures("svc").unwrap(), 1);
        let history = store.history("svc").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].action_taken.as_deref(),
            Some("waiting_for_consecutive")
        );

        // Second consecutive failure crosses the threshold; recovery
        // (start alone) succeeds and the counter resets.
        let code = run_checks(&config, &mut store).unwrap();
        assert_eq!(code, 0);
        assert_eq!(store.consecutive_failures("svc").unwrap(), 0);
        assert_eq!(store.history("svc").unwrap().len(), 2);
    }

    #[test]
    fn test_failed_recovery_sets_exit_code() {
        let dir = TempDir::new().unwrap();
        let hb = dir.path().join("svc.json");
        write_heartbeat(&hb, std::process::id() as i32, 300);

        // Threshold 1: recovery triggers on the first failure. The
        // start command exits immediately, so the pipeline aborts.
        let mut config = config_for(&dir, &hb, 1, "exit 1");
        config
            .processes
            .get_mut("svc")
            .unwrap()
            .disabled_actions
            .push("kill".to_string());

        let mut store = Store::open_in_memory().unwrap();
        let code = run_checks(&config, &mut store).unwrap();

        assert_eq!(code, 1);
        // Counter not reset after a failed recovery.
        assert_eq!(store.consecutive_failures("svc").unwrap(), 1);
    }

    #[test]
    fn test_healthy_check_resets_counter() {
        let dir = TempDir::new().unwrap();
        let hb = dir.path().join("svc.json");
        let config = config_for(&dir, &hb, 5, "sleep 5");
        let mut store = Store::open_in_memory().unwrap();

        // Missing heartbeat: NoHeartbeat failures accumulate.
        run_checks(&config, &mut store).unwrap();
        run_checks(&config, &mut store).unwrap();
        assert_eq!(store.consecutive_failures("svc").unwrap(), 2);

        // Fresh heartbeat with a live PID: healthy, counter resets.
        write_heartbeat(&hb, std::process::id() as i32, 1);
        let code = run_checks(&config, &mut store).unwrap();
        assert_eq!(code, 0);
        assert_eq!(store.consecutive_failures("svc").unwrap(), 0);
    }

    #[test]
    fn test_handle_check_respects_lock_contention() {
        let dir = TempDir::new().unwrap();
        let hb = dir.path().join("svc.json");
        write_heartbeat(&hb, std::process::id() as i32, 1);
        let config = config_for(&dir, &hb, 2, "sleep 5");

        let _held = crate::lock::LockHandle::acquire(&config.config.lock_path)
            .unwrap()
            .unwrap();

        // Lock already held: immediate success, nothing recorded.
        let code = handle_check(&config).unwrap();
        assert_eq!(code, 0);

        let store = Store::open(&config.config.db_path).unwrap();
        assert_eq!(store.history("svc").unwrap().len(), 0);
    }
}
