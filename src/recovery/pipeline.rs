//! The recovery pipeline orchestrator
//!
//! Executes a process's configured recovery actions strictly in order.
//! A failed `kill` or `start` aborts the pipeline (the old process may
//! still hold resources, or nothing is running); a failed auxiliary
//! script logs a warning and the pipeline continues.

use crate::config::{GlobalConfig, ProcessSpec};
use crate::recovery::cleaner::{ScriptResult, run_script};
use crate::recovery::killer::{KillResult, kill_process};
use crate::recovery::restarter::{LaunchResult, spawn_detached};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};

/// A recovery action resolved from its configured name
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Terminate the process recorded in the heartbeat
    Kill,
    /// Launch the configured start command, detached
    Start { command: String },
    /// Run a named cleanup script from the commands map
    Script { name: String, command: String },
}

impl RecoveryAction {
    /// Resolve a configured action name against a commands map.
    ///
    /// `None` means the name has no runnable command; config validation
    /// rejects such names up front.
    pub fn resolve(name: &str, commands: &BTreeMap<String, String>) -> Option<Self> {
        match name {
            "kill" => Some(RecoveryAction::Kill),
            "start" => commands.get("start").map(|c| RecoveryAction::Start {
                command: c.clone(),
            }),
            other => commands.get(other).map(|c| RecoveryAction::Script {
                name: other.to_string(),
                command: c.clone(),
            }),
        }
    }
}

/// Result of one executed pipeline step
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Kill(KillResult),
    /// A `kill` step with no PID to act on: nothing to kill, counts as
    /// an immediate success
    NothingToKill,
    Start(LaunchResult),
    Script(ScriptResult),
    /// The action name resolved to no runnable command
    Unresolved,
}

impl ActionOutcome {
    pub fn success(&self) -> bool {
        match self {
            ActionOutcome::Kill(r) => r.success,
            ActionOutcome::NothingToKill => true,
            ActionOutcome::Start(r) => r.success,
            ActionOutcome::Script(r) => r.success,
            ActionOutcome::Unresolved => false,
        }
    }

    /// Error detail for a failed step, if the executor reported one
    pub fn detail(&self) -> Option<String> {
        match self {
            ActionOutcome::Kill(r) => r.error.clone(),
            ActionOutcome::NothingToKill => None,
            ActionOutcome::Start(r) => r.error.clone(),
            ActionOutcome::Script(r) => r
                .error
                .clone()
                .or_else(|| (!r.stderr.is_empty()).then(|| r.stderr.clone()))
                .or_else(|| r.exit_code.map(|c| format!("exit code {c}"))),
            ActionOutcome::Unresolved => Some("no matching command".to_string()),
        }
    }
}

/// Global knobs the pipeline hands to the executors
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    pub kill_timeout: Duration,
    pub cleanup_timeout: Duration,
    pub verify_delay: Duration,
    pub cleanup_args: Vec<String>,
}

impl From<&GlobalConfig> for RecoveryOptions {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            kill_timeout: Duration::from_secs(config.kill_timeout_seconds),
            cleanup_timeout: Duration::from_secs(config.cleanup_timeout_seconds),
            verify_delay: Duration::from_secs(config.verify_delay_seconds),
            cleanup_args: config.cleanup_args.clone(),
        }
    }
}

/// Structured outcome of one recovery invocation
#[derive(Debug)]
pub struct PipelineOutcome {
    pub process_key: String,
    /// Steps actually attempted, in execution order
    pub steps: Vec<(String, ActionOutcome)>,
    /// True when every configured action completed without an
    /// abort-class failure
    pub fully_recovered: bool,
    /// Name of the action whose failure aborted the pipeline
    pub stage_failed: Option<String>,
}

/// The executor seam, so the ordering and abort semantics are testable
/// without touching real processes
trait Executors {
    fn kill(&mut self, pid: i32, timeout: Duration) -> KillResult;
    fn script(&mut self, path: &str, args: &[String], timeout: Duration) -> ScriptResult;
    fn start(&mut self, command: &str, verify_delay: Duration) -> LaunchResult;
}

struct SystemExecutors;

impl Executors for SystemExecutors {
    fn kill(&mut self, pid: i32, timeout: Duration) -> KillResult {
        kill_process(pid, timeout)
    }

    fn script(&mut self, path: &str, args: &[String], timeout: Duration) -> ScriptResult {
        run_script(path, args, timeout)
    }

    fn start(&mut self, command: &str, verify_delay: Duration) -> LaunchResult {
        spawn_detached(command, verify_delay)
    }
}

/// Execute the process's effective recovery actions in order.
pub fn run_recovery(
    process_key: &str,
    pid: Option<i32>,
    spec: &ProcessSpec,
    opts: &RecoveryOptions,
) -> PipelineOutcome {
    run_recovery_with(&mut SystemExecutors, process_key, pid, spec, opts)
}

fn run_recovery_with(
    exec: &mut impl Executors,
    process_key: &str,
    pid: Option<i32>,
    spec: &ProcessSpec,
    opts: &RecoveryOptions,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome {
        process_key: process_key.to_string(),
        steps: Vec::new(),
        fully_recovered: false,
        stage_failed: None,
    };

    for name in spec.effective_recovery_actions() {
        let result = match RecoveryAction::resolve(&name, &spec.commands) {
            Some(RecoveryAction::Kill) => match pid {
                Some(pid) => {
                    info!("{process_key}: killing PID {pid}");
                    ActionOutcome::Kill(exec.kill(pid, opts.kill_timeout))
                }
                None => {
                    info!("{process_key}: no PID, nothing to kill");
                    ActionOutcome::NothingToKill
                }
            },
            Some(RecoveryAction::Start { command }) => {
                info!("{process_key}: starting '{command}'");
                ActionOutcome::Start(exec.start(&command, opts.verify_delay))
            }
            Some(RecoveryAction::Script { name, command }) => {
                info!("{process_key}: running '{name}' ({command})");
                ActionOutcome::Script(exec.script(&command, &opts.cleanup_args, opts.cleanup_timeout))
            }
            None => ActionOutcome::Unresolved,
        };

        let succeeded = result.success();
        let detail = result.detail();
        outcome.steps.push((name.clone(), result));

        if !succeeded {
            let detail = detail.unwrap_or_else(|| "unknown error".to_string());
            // kill and start are load-bearing: a failed kill means the
            // old process may still hold resources, a failed start
            // means nothing is running.
            if name == "kill" || name == "start" {
                error!("{process_key}: '{name}' failed: {detail}, aborting recovery");
                outcome.stage_failed = Some(name);
                return outcome;
            }
            warn!("{process_key}: '{name}' failed: {detail} (continuing)");
        }
    }

    outcome.fully_recovered = true;
    outcome
}
