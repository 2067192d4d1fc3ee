//! Recovery primitives and the recovery pipeline
//!
//! Provides:
//! - Terminate-by-PID with signal escalation
//! - Bounded-time external script execution
//! - Detached process launch with liveness verification
//! - The ordered pipeline that drives them per process

pub mod cleaner;
pub mod killer;
pub mod pipeline;
pub mod restarter;

pub use cleaner::{ScriptResult, run_script};
pub use killer::{KillResult, kill_process};
pub use pipeline::{PipelineOutcome, RecoveryOptions, run_recovery};
pub use restarter::{LaunchResult, spawn_detached};
