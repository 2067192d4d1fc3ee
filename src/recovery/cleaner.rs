//! Run external cleanup scripts with bounded execution time
//!
//! Every failure mode (nonzero exit, timeout, missing executable, OS
//! launch error) is captured in the returned result; nothing escapes
//! as an error to the caller.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a cleanup script run
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptResult {
    pub success: bool,
    pub script_path: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl ScriptResult {
    fn launch_failed(script_path: &str, error: String) -> Self {
        Self {
            success: false,
            script_path: script_path.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error: Some(error),
        }
    }
}

/// Execute a script with the given arguments, capturing output.
///
/// Success iff the script exits 0. A run exceeding `timeout` is killed
/// and reported as a timeout failure.
pub fn run_script(script_path: &str, args: &[String], timeout: Duration) -> ScriptResult {
    let mut child = match Command::new(script_path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ScriptResult::launch_failed(
                script_path,
                format!("Failed to launch '{script_path}': {e}"),
            );
        }
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut stdout = String::new();
                let mut stderr = String::new();
                if let Some(mut handle) = child.stdout.take() {
                    let _ = handle.read_to_string(&mut stdout);
                }
                if let Some(mut handle) = child.stderr.take() {
                    let _ = handle.read_to_string(&mut stderr);
                }

                return ScriptResult {
                    success: status.success(),
                    script_path: script_path.to_string(),
                    stdout,
                    stderr,
                    exit_code: status.code(),
                    error: None,
                };
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return ScriptResult::launch_failed(
                        script_path,
                        format!("Script timed out after {} seconds", timeout.as_secs()),
                    );
                }
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                return ScriptResult::launch_failed(
                    script_path,
                    format!("Failed to wait for script: {e}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_successful_script_captures_output() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ok.sh", "echo cleaned: $1");

        let result = run_script(&script, &["--force".to_string()], Duration::from_secs(10));
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "cleaned: --force");
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_nonzero_exit_is_failure_with_stderr() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "fail.sh", "echo broken >&2; exit 3");

        let result = run_script(&script, &[], Duration::from_secs(10));
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr.trim(), "broken");
    }

    #[test]
    fn test_missing_script_is_failure_not_panic() {
        let result = run_script("/no/such/script.sh", &[], Duration::from_secs(10));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Failed to launch"));
    }

    #[test]
    fn test_timeout_kills_and_reports() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "hang.sh", "sleep 30");

        let start = Instant::now();
        let result = run_script(&script, &[], Duration::from_millis(300));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        // Killed promptly, did not run to completion.
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
