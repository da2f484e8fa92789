//! # Per-Repository Materialization
//!
//! The `Materializer` turns one cached clone into files on disk, in one of
//! two mutually exclusive modes selected by the repository's configuration:
//!
//! - **Full-worktree mode** (`dstDir` set): the destination directory is
//!   removed if present and a worktree of the pinned version is checked out
//!   directly in its place. The removal is deliberate: a checkout does not
//!   delete files that existed in a previously materialized version but not
//!   in this one.
//!
//! - **Subtree mode** (`sources` set): a worktree is checked out into a
//!   transient directory under the cache root, each source glob is expanded
//!   against it, and the matches are copied to their destinations. The
//!   transient worktree is removed when extraction finishes, successfully or
//!   not.
//!
//! A glob that matches nothing copies nothing and is not an error; a
//! malformed glob pattern is.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::config::{Repository, Source};
use crate::copy;
use crate::defaults;
use crate::error::{Error, Result};
use crate::exec;
use crate::git::Git;

/// Materializes repositories out of the clone cache.
pub struct Materializer {
    git: Arc<dyn Git>,
}

impl Materializer {
    pub fn new(git: Arc<dyn Git>) -> Self {
        Self { git }
    }

    /// Materialize `repo` from its cached clone.
    ///
    /// `cache_dir` hosts the transient worktree used by subtree mode.
    pub fn materialize(&self, repo: &Repository, clone_dir: &Path, cache_dir: &Path) -> Result<()> {
        if let Some(dst_dir) = &repo.dst_dir {
            self.worktree_into(repo, clone_dir, dst_dir)?;
        }

        if !repo.sources.is_empty() {
            self.extract_sources(repo, clone_dir, cache_dir)?;
        }

        Ok(())
    }

    /// Full-worktree mode: check out the pinned version directly at
    /// `dst_dir`, replacing whatever tree was there.
    fn worktree_into(&self, repo: &Repository, clone_dir: &Path, dst_dir: &Path) -> Result<()> {
        if dst_dir.is_dir() {
            // A checkout would leave files from a previously materialized
            // version behind, so the whole tree goes first.
            info!("removing stale destination dst_dir={}", dst_dir.display());
            fs::remove_dir_all(dst_dir).map_err(|e| Error::Worktree {
                version: repo.version.clone(),
                path: dst_dir.display().to_string(),
                message: format!("cannot remove stale destination: {}", e),
            })?;
        }

        self.git
            .worktree(clone_dir, &repo.version, dst_dir)
            .map_err(|e| Error::Worktree {
                version: repo.version.clone(),
                path: dst_dir.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Subtree mode: check out into a transient worktree and copy the
    /// configured sources out of it.
    fn extract_sources(&self, repo: &Repository, clone_dir: &Path, cache_dir: &Path) -> Result<()> {
        exec::in_temp_dir(cache_dir, defaults::TMP_PREFIX, |tmp| {
            // The worktree's base name mirrors the clone's so concurrent
            // versions of different repositories never collide.
            let base = clone_dir.file_name().ok_or_else(|| Error::Worktree {
                version: repo.version.clone(),
                path: clone_dir.display().to_string(),
                message: "clone directory has no base name".to_string(),
            })?;
            let worktree_dir = tmp.join(base);

            self.git
                .worktree(clone_dir, &repo.version, &worktree_dir)
                .map_err(|e| Error::Worktree {
                    version: repo.version.clone(),
                    path: worktree_dir.display().to_string(),
                    message: e.to_string(),
                })?;

            for source in &repo.sources {
                self.copy_source(source, &worktree_dir)?;
            }
            Ok(())
        })
    }

    /// Expand one source glob against the worktree and copy every match.
    fn copy_source(&self, source: &Source, worktree_dir: &Path) -> Result<()> {
        let pattern = worktree_dir.join(&source.src);
        debug!("expanding source pattern={}", pattern.display());

        for entry in glob::glob(&pattern.to_string_lossy())? {
            let src = entry.map_err(|e| Error::Io(e.into_error()))?;
            let metadata = fs::metadata(&src)?;

            if metadata.is_dir() {
                let dst_dir = source.dst_dir.as_deref().ok_or_else(|| Error::Copy {
                    src: src.display().to_string(),
                    dst: source.src.clone(),
                    message: "directory source requires 'dstDir'".to_string(),
                })?;
                if dst_dir.is_dir() {
                    fs::remove_dir_all(dst_dir).map_err(|e| Error::Copy {
                        src: src.display().to_string(),
                        dst: dst_dir.display().to_string(),
                        message: format!("cannot remove existing destination: {}", e),
                    })?;
                }
                copy::copy_dir(&src, dst_dir)?;
            } else if let Some(dst_file) = &source.dst_file {
                copy::copy_file(&src, dst_file)?;
            } else if let Some(dst_dir) = &source.dst_dir {
                fs::create_dir_all(dst_dir)?;
                let base = src.file_name().unwrap_or_default();
                copy::copy_file(&src, &dst_dir.join(base))?;
            }
        }

        Ok(())
    }
}
