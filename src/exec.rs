//! # External Command Execution
//!
//! This module defines the `Exec` trait, a narrow interface over external
//! process execution. The engine never shells out directly; it goes through
//! `Exec` so that tests can substitute a recording mock and run without
//! spawning real processes.
//!
//! `SystemExec` is the production implementation, built on
//! `std::process::Command`. It captures combined stdout/stderr output and
//! turns a non-zero exit status into `Error::CommandFailed` carrying that
//! output.
//!
//! The module also provides `in_temp_dir`, a scoped temporary-directory
//! helper: the directory is created under a given parent, handed to a
//! closure, and removed when the closure returns, no matter how it returns.

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Trait for external command execution - allows mocking in tests
pub trait Exec: Send + Sync {
    /// Run a command, returning its combined stdout/stderr output.
    fn run_cmd(&self, name: &str, args: &[String]) -> Result<String>;

    /// Run a command with the given working directory, returning its combined
    /// stdout/stderr output.
    fn run_cmd_in_dir(&self, name: &str, args: &[String], cwd: &Path) -> Result<String>;
}

/// The production implementation of `Exec`, spawning real processes.
#[derive(Debug, Default)]
pub struct SystemExec;

impl SystemExec {
    fn run(&self, name: &str, args: &[String], cwd: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new(name);
        cmd.args(args);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let display = format!("{} {}", name, args.join(" "));
        debug!(
            "exec command={:?} cwd={:?}",
            display,
            cwd.map(Path::display)
        );

        let output = cmd.output().map_err(|e| Error::CommandFailed {
            command: display.clone(),
            message: e.to_string(),
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!("exec result output={:?}", combined);

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: display,
                message: format!("{}: {}", output.status, combined.trim()),
            });
        }

        Ok(combined)
    }
}

impl Exec for SystemExec {
    fn run_cmd(&self, name: &str, args: &[String]) -> Result<String> {
        self.run(name, args, None)
    }

    fn run_cmd_in_dir(&self, name: &str, args: &[String], cwd: &Path) -> Result<String> {
        self.run(name, args, Some(cwd))
    }
}

/// Create a temporary directory under `parent` and run `f` with its path.
///
/// The directory is removed when `f` returns, regardless of outcome. Removal
/// failures are ignored; there is nothing useful to do about them during
/// cleanup.
pub fn in_temp_dir<T, F>(parent: &Path, prefix: &str, f: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let tmp = tempfile::Builder::new().prefix(prefix).tempdir_in(parent)?;
    debug!("created tempdir dir={}", tmp.path().display());

    let result = f(tmp.path());

    debug!("removing tempdir dir={}", tmp.path().display());
    result
}
