//! Terminate a process by PID with SIGTERM -> SIGKILL escalation

use crate::probe::is_pid_alive;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting for a signalled process to exit
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Grace period after SIGKILL before declaring the process unkillable
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Outcome of a kill attempt
#[derive(Debug, Clone, PartialEq)]
pub struct KillResult {
    pub success: bool,
    pub pid: i32,
    pub error: Option<String>,
}

impl KillResult {
    fn ok(pid: i32) -> Self {
        Self {
            success: true,
            pid,
            error: None,
        }
    }

    fn failed(pid: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            pid,
            error: Some(error.into()),
        }
    }
}

/// Kill a process: SIGTERM first, then SIGKILL after `timeout`.
///
/// A process that is already gone succeeds immediately, with no
/// polling. A permission error on either signal is a hard failure:
/// the process belongs to another principal and cannot be recovered
/// from here.
pub fn kill_process(pid: i32, timeout: Duration) -> KillResult {
    let target = Pid::from_raw(pid);

    match kill(target, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return KillResult::ok(pid),
        Err(e) => return KillResult::failed(pid, format!("SIGTERM failed: {e}")),
    }

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_pid_alive(pid) {
            return KillResult::ok(pid);
        }
        thread::sleep(POLL_INTERVAL);
    }

    match kill(target, Signal::SIGKILL) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return KillResult::ok(pid),
        Err(e) => return KillResult::failed(pid, format!("SIGKILL failed: {e}")),
    }

    thread::sleep(KILL_GRACE);
    if is_pid_alive(pid) {
        KillResult::failed(pid, "Process survived SIGKILL")
    } else {
        KillResult::ok(pid)
    }
}
