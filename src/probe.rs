//! PID liveness probe
//!
//! Checks whether a process is currently running using a zero-effect
//! signal probe against the OS process table.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check if a process with the given PID is running.
///
/// Sends signal 0 (existence probe, no effect on the target). A
/// permission-denied result means the process exists but is owned by
/// another principal, so it counts as alive: when liveness cannot be
/// disproven, assume the process is running rather than risk a
/// duplicate restart.
pub fn is_pid_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => true,
    }
}
