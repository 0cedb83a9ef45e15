// Privileged action gate and privilege escalation for zram-advisor
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::helpers;
use crate::info;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Helper error: {0}")]
    Helper(#[from] crate::helpers::HelperError),
    #[error("Command failed: {0}")]
    CommandFailed(String),
    #[error("Cannot escalate privileges: {0}")]
    PrivilegeUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ExecError>;

/// Single gate for every privileged action the lifecycle side performs.
/// In dry-run mode actions are echoed instead of executed. Whether a
/// failure is fatal is the caller's call, not the gate's.
#[derive(Debug, Clone, Copy)]
pub struct Runner {
    pub dry_run: bool,
}

impl Runner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Run an external command, discarding its output.
    pub fn run(&self, cmd: &[&str]) -> Result<()> {
        if self.dry_run {
            info!("DRY-RUN: would run: {}", cmd.join(" "));
            return Ok(());
        }
        let status = Command::new(cmd[0])
            .args(&cmd[1..])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecError::CommandFailed(format!(
                "{} exited with {}",
                cmd.join(" "),
                status
            )))
        }
    }

    /// Write a value into a file (sysfs tunable, unit file, init script).
    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        if self.dry_run {
            let shown = content.lines().next().unwrap_or("");
            info!("DRY-RUN: would write '{}' to {}", shown, path);
            return Ok(());
        }
        helpers::write_file(path, content)?;
        Ok(())
    }

    /// Copy a file into place.
    pub fn copy_file(&self, from: &Path, to: &str) -> Result<()> {
        if self.dry_run {
            info!("DRY-RUN: would copy {} to {}", from.display(), to);
            return Ok(());
        }
        fs::copy(from, to)?;
        Ok(())
    }

    /// Remove a file if present. Returns true when something was there.
    pub fn remove_file(&self, path: &str) -> Result<bool> {
        if !Path::new(path).exists() && !Path::new(path).is_symlink() {
            return Ok(false);
        }
        if self.dry_run {
            info!("DRY-RUN: would remove {}", path);
            return Ok(true);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Create a relative symlink (rc.d style), replacing any existing one.
    pub fn symlink(&self, target: &str, link_name: &str) -> Result<()> {
        if self.dry_run {
            info!("DRY-RUN: would symlink {} -> {}", link_name, target);
            return Ok(());
        }
        helpers::relative_symlink(target, link_name)?;
        Ok(())
    }
}

/// Ensure the process runs as root, re-invoking itself once under sudo
/// if needed. Called at the entry boundary only; the re-invoked process
/// passes the euid check and never escalates again. Dry-run skips
/// escalation entirely so echo-only invocations work unprivileged.
pub fn ensure_root(dry_run: bool) -> Result<()> {
    if dry_run || nix::unistd::geteuid().is_root() {
        return Ok(());
    }

    let exe = std::env::current_exe()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    info!("Not running as root, re-invoking under sudo");

    // exec() only returns on failure
    let err = Command::new("sudo").arg(&exe).args(&args).exec();
    Err(ExecError::PrivilegeUnavailable(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_never_executes() {
        let runner = Runner::new(true);
        // A command that cannot exist still "succeeds" in dry-run mode
        assert!(runner.run(&["/nonexistent/definitely-not-a-command"]).is_ok());
        assert!(runner.write_file("/proc/sys/vm/swappiness", "180").is_ok());
    }

    #[test]
    fn test_real_run_reports_failure() {
        let runner = Runner::new(false);
        assert!(runner.run(&["/nonexistent/definitely-not-a-command"]).is_err());
    }

    #[test]
    fn test_remove_absent_file_is_noop() {
        let runner = Runner::new(false);
        let removed = runner.remove_file("/nonexistent/no-such-file").unwrap();
        assert!(!removed);
    }

    #[test]
    fn test_dry_run_remove_reports_presence() {
        let runner = Runner::new(true);
        // An existing path is reported as "would remove" without touching it
        let removed = runner.remove_file("/proc/meminfo").unwrap();
        assert!(removed);
        assert!(std::path::Path::new("/proc/meminfo").exists());
    }
}
