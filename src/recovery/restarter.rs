//! Launch a process detached from the supervisor
//!
//! Started commands must outlive the short-lived supervisor run, so
//! the child is placed in its own session via setsid before exec.

use nix::unistd::setsid;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Outcome of a detached launch
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchResult {
    pub success: bool,
    pub pid: Option<i32>,
    pub command: String,
    pub error: Option<String>,
}

/// Start a command via `sh -c`, detached, and verify it survives.
///
/// After spawning, waits `verify_delay` and polls whether the child
/// already exited; an immediate exit is reported as a failure with the
/// exit code. Launch errors are reported in the result, never raised.
pub fn spawn_detached(command: &str, verify_delay: Duration) -> LaunchResult {
    let mut cmd = Command::new("/bin/sh");
    cmd.args(["-c", command])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // New session: the child must not die with the supervisor's
    // controlling terminal or process group.
    unsafe {
        cmd.pre_exec(|| {
            setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return LaunchResult {
                success: false,
                pid: None,
                command: command.to_string(),
                error: Some(e.to_string()),
            };
        }
    };

    thread::sleep(verify_delay);

    match child.try_wait() {
        Ok(Some(status)) => LaunchResult {
            success: false,
            pid: Some(child.id() as i32),
            command: command.to_string(),
            error: Some(format!(
                "Process exited immediately with code {}",
                status.code().map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )),
        },
        Ok(None) => LaunchResult {
            success: true,
            pid: Some(child.id() as i32),
            command: command.to_string(),
            error: None,
        },
        Err(e) => LaunchResult {
            success: false,
            pid: Some(child.id() as i32),
            command: command.to_string(),
            error: Some(format!("Failed to poll launched process: {e}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::is_pid_alive;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    #[test]
    fn test_launch_long_running_command_succeeds() {
        let result = spawn_detached("sleep 30", Duration::from_millis(200));

        assert!(result.success);
        let pid = result.pid.unwrap();
        assert!(is_pid_alive(pid));

        // Don't leak the sleeper past the test.
        let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
    }

    #[test]
    fn test_immediate_exit_is_failure_with_code() {
        let result = spawn_detached("exit 7", Duration::from_millis(200));

        assert!(!result.success);
        assert!(result.error.unwrap().contains("code 7"));
    }

    #[test]
    fn test_unlaunchable_command_reports_failure() {
        // sh itself launches, then fails to find the command and exits
        // nonzero: reported as an immediate exit, not a panic.
        let result = spawn_detached("/no/such/binary --flag", Duration::from_millis(200));
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
