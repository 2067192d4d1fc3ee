//! Crontab integration
//!
//! Builds and installs the crontab entry that drives timer-mode
//! checks. Installation is idempotent; removal deletes exactly the
//! lines this tool would have added.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Check every 2 minutes
pub const CRON_SCHEDULE: &str = "*/2 * * * *";

/// Build the crontab line for the current executable and config.
pub fn cron_line(config_path: &Path, log_dir: &Path) -> Result<String> {
    let exe = std::env::current_exe()?;
    Ok(build_cron_line(&exe, config_path, log_dir))
}

fn build_cron_line(exe: &Path, config_path: &Path, log_dir: &Path) -> String {
    format!(
        "{CRON_SCHEDULE} {} --config {} check >> {}/cron.log 2>&1",
        exe.display(),
        config_path.display(),
        log_dir.display()
    )
}

/// Read the current user's crontab; an empty crontab is not an error.
fn read_crontab() -> Result<String> {
    let output = Command::new("crontab")
        .arg("-l")
        .output()
        .map_err(|e| Error::Cron(format!("failed to run crontab -l: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        // "no crontab for user" exits nonzero; treat as empty.
        Ok(String::new())
    }
}

/// Replace the current user's crontab wholesale.
fn write_crontab(content: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Cron(format!("failed to run crontab: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .map_err(|e| Error::Cron(format!("failed to write crontab: {e}")))?;
    }

    let status = child
        .wait()
        .map_err(|e| Error::Cron(format!("failed to wait for crontab: {e}")))?;
    if !status.success() {
        return Err(Error::Cron(format!(
            "crontab exited with {}",
            status.code().unwrap_or(-1)
        )));
    }

    Ok(())
}

/// Whether the entry is currently installed.
pub fn is_active(line: &str) -> bool {
    read_crontab().map(|c| crontab_contains(&c, line)).unwrap_or(false)
}

fn crontab_contains(crontab: &str, line: &str) -> bool {
    crontab.lines().any(|l| l.trim() == line.trim())
}

/// Install the entry. Returns false if it was already present.
pub fn install(line: &str) -> Result<bool> {
    let current = read_crontab()?;
    if crontab_contains(&current, line) {
        return Ok(false);
    }

    let new_crontab = append_line(&current, line);
    write_crontab(&new_crontab)?;
    Ok(true)
}

fn append_line(crontab: &str, line: &str) -> String {
    if crontab.is_empty() {
        format!("{line}\n")
    } else {
        format!("{}\n{line}\n", crontab.trim_end_matches('\n'))
    }
}

/// Remove the entry. Returns false if it was not installed.
pub fn remove(line: &str) -> Result<bool> {
    let current = read_crontab()?;
    if !crontab_contains(&current, line) {
        return Ok(false);
    }

    let remaining = strip_line(&current, line);
    write_crontab(&remaining)?;
    Ok(true)
}

fn strip_line(crontab: &str, line: &str) -> String {
    let kept: Vec<&str> = crontab
        .lines()
        .filter(|l| l.trim() != line.trim())
        .collect();
    if kept.is_empty() {
        String::new()
    } else {
        format!("{}\n", kept.join("\n"))
    }
}

/// Install or remove, per the dashboard toggle.
pub fn toggle(line: &str, enable: bool) -> Result<()> {
    if enable {
        install(line)?;
    } else {
        remove(line)?;
    }
    Ok(())
}
