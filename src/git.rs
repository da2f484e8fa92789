//! # Git Operations
//!
//! This module defines the `Git` trait, the narrow interface through which
//! the engine drives `git`. The four operations are exactly what overlay
//! materialization needs: create a bare clone, refresh it, extract a
//! worktree at a pinned revision, and probe whether a clone carries our
//! origin remote.
//!
//! `SystemGit` is the production implementation. It delegates process
//! execution to the `Exec` collaborator rather than spawning `git` itself,
//! which keeps the wire-level mechanics in one place and lets tests assert
//! the exact argv without a git binary present.
//!
//! Clones are bare and blob-filtered: only history and metadata are
//! downloaded up front, and `git worktree add` later fetches whichever blobs
//! the requested revision actually needs.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::error::Result;
use crate::exec::Exec;

/// Trait for git operations - allows mocking in tests
pub trait Git: Send + Sync {
    /// Create a bare, blob-filtered clone of `url` at `clone_dir`, with the
    /// remote registered under `origin`.
    fn clone_bare(&self, url: &str, origin: &str, clone_dir: &Path) -> Result<()>;

    /// Refresh an existing clone: force-fetch all branches and tags from
    /// `origin`.
    fn update(&self, origin: &str, clone_dir: &Path) -> Result<()>;

    /// Check out `version` from the clone at `clone_dir` into `dst_dir`.
    fn worktree(&self, clone_dir: &Path, version: &str, dst_dir: &Path) -> Result<()>;

    /// Whether the clone at `clone_dir` has a remote named `origin`.
    fn remote_exists(&self, clone_dir: &Path, origin: &str) -> Result<bool>;
}

/// The production implementation of `Git`, driving the system `git` binary
/// through the `Exec` collaborator.
///
/// Using the system binary means SSH keys, credential helpers, and anything
/// else configured in `~/.gitconfig` work without any handling here.
pub struct SystemGit {
    exec: Arc<dyn Exec>,
}

impl SystemGit {
    pub fn new(exec: Arc<dyn Exec>) -> Self {
        Self { exec }
    }
}

impl Git for SystemGit {
    fn clone_bare(&self, url: &str, origin: &str, clone_dir: &Path) -> Result<()> {
        self.exec.run_cmd(
            "git",
            &[
                "clone".to_string(),
                "--bare".to_string(),
                "--filter=blob:none".to_string(),
                "--origin".to_string(),
                origin.to_string(),
                url.to_string(),
                clone_dir.display().to_string(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, origin: &str, clone_dir: &Path) -> Result<()> {
        self.exec.run_cmd_in_dir(
            "git",
            &[
                "fetch".to_string(),
                "--force".to_string(),
                "--prune".to_string(),
                "--tags".to_string(),
                origin.to_string(),
                "+refs/heads/*:refs/heads/*".to_string(),
            ],
            clone_dir,
        )?;
        Ok(())
    }

    fn worktree(&self, clone_dir: &Path, version: &str, dst_dir: &Path) -> Result<()> {
        let dst = std::path::absolute(dst_dir)?;

        info!(
            "extracting from={} version={} to={}",
            clone_dir.display(),
            version,
            dst.display()
        );

        self.exec.run_cmd_in_dir(
            "git",
            &[
                "worktree".to_string(),
                "add".to_string(),
                "--force".to_string(),
                dst.display().to_string(),
                version.to_string(),
            ],
            clone_dir,
        )?;

        // `git worktree add` leaves a breadcrumb file pointing back at the
        // clone; the destination is a plain tree in our use case, so drop it
        // along with the clone's registration of the worktree.
        let _ = std::fs::remove_file(dst.join(".git"));
        if let Err(e) =
            self.exec
                .run_cmd_in_dir("git", &["worktree".to_string(), "prune".to_string()], clone_dir)
        {
            debug!("worktree prune failed clone_dir={}: {}", clone_dir.display(), e);
        }

        Ok(())
    }

    fn remote_exists(&self, clone_dir: &Path, origin: &str) -> Result<bool> {
        // A missing or foreign directory is simply "no remote here".
        match self
            .exec
            .run_cmd_in_dir("git", &["remote".to_string()], clone_dir)
        {
            Ok(output) => Ok(output.lines().any(|line| line.trim() == origin)),
            Err(_) => Ok(false),
        }
    }
}
