//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `overlay.yaml`
//! manifest, as well as the logic for parsing and validating it. The manifest
//! declares an ordered list of Git repositories to overlay onto the local
//! filesystem tree.
//!
//! ## Key Components
//!
//! - **`Repository`**: One declared dependency: a Git URL, a pinned version
//!   (SHA or tag), and either a full-worktree destination (`dstDir`) or a
//!   list of `sources` to extract. Optionally a list of post-materialization
//!   `commands`.
//!
//! - **`Source`**: A glob pattern relative to the repository root and exactly
//!   one of a file destination (`dstFile`) or directory destination
//!   (`dstDir`).
//!
//! - **`Config`**: The fully validated structure handed to the engine: cache
//!   directory, parallel/sequential flag, skip-commands flag, and the ordered
//!   repository list.
//!
//! ## Validation
//!
//! `parse` rejects manifests the engine would mishandle: a repository must
//! populate exactly one of `dstDir` or `sources`, and each source exactly one
//! of `dstFile` or `dstDir`. Destination directories of `.` or `..` are
//! rejected because materialization removes them recursively.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mapping of a file or directory to copy out of a worktree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Source {
    /// Glob pattern of the files or directories to copy, relative to the
    /// repository's worktree root.
    pub src: String,
    /// Destination of a single-file copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_file: Option<PathBuf>,
    /// Destination directory of a file or directory copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_dir: Option<PathBuf>,
}

/// A command to execute after a repository has been materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    /// Program to run.
    pub cmd: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// One declared Git repository to overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Repository {
    /// URL of the Git repository to clone.
    pub git: String,
    /// The commit SHA or tag to materialize.
    pub version: String,
    /// Destination directory for a full worktree checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_dir: Option<PathBuf>,
    /// Files and/or directories to extract instead of a full checkout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    /// Commands to execute after materialization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
}

/// Top-level shape of the `overlay.yaml` manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    repositories: Vec<Repository>,
}

/// The validated configuration consumed by the overlay engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the shared clone cache. Also holds the lock file and
    /// transient worktrees.
    pub cache_dir: PathBuf,
    /// Clone/update repositories concurrently.
    pub parallel: bool,
    /// Skip post-materialization commands.
    pub skip_commands: bool,
    /// Repositories to overlay, in manifest order.
    pub repositories: Vec<Repository>,
}

/// Parse and validate a manifest from a YAML string.
pub fn parse(yaml: &str) -> Result<Vec<Repository>> {
    let manifest: Manifest = serde_yaml::from_str(yaml)?;
    validate(&manifest.repositories)?;
    Ok(manifest.repositories)
}

/// Load and validate a manifest file.
pub fn load(path: &Path) -> Result<Vec<Repository>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: Some("run from a directory containing overlay.yaml, or pass --file".to_string()),
    })?;
    parse(&contents)
}

fn validate(repositories: &[Repository]) -> Result<()> {
    for repo in repositories {
        if repo.git.is_empty() {
            return Err(Error::ConfigParse {
                message: "repository 'git' must not be empty".to_string(),
                hint: None,
            });
        }
        if repo.version.is_empty() {
            return Err(Error::ConfigParse {
                message: format!("repository {}: 'version' must not be empty", repo.git),
                hint: Some("pin a commit SHA or tag".to_string()),
            });
        }
        match (&repo.dst_dir, repo.sources.is_empty()) {
            (Some(_), false) => {
                return Err(Error::ConfigParse {
                    message: format!(
                        "repository {}: 'dstDir' and 'sources' are mutually exclusive",
                        repo.git
                    ),
                    hint: Some(
                        "use 'dstDir' for a full checkout or 'sources' for selected files"
                            .to_string(),
                    ),
                });
            }
            (None, true) => {
                return Err(Error::ConfigParse {
                    message: format!(
                        "repository {}: one of 'dstDir' or 'sources' is required",
                        repo.git
                    ),
                    hint: None,
                });
            }
            _ => {}
        }
        if let Some(dst_dir) = &repo.dst_dir {
            validate_dst_dir(&repo.git, dst_dir)?;
        }
        for source in &repo.sources {
            validate_source(&repo.git, source)?;
        }
        for command in &repo.commands {
            if command.cmd.is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("repository {}: 'cmd' must not be empty", repo.git),
                    hint: None,
                });
            }
        }
    }
    Ok(())
}

fn validate_source(git: &str, source: &Source) -> Result<()> {
    if source.src.is_empty() {
        return Err(Error::ConfigParse {
            message: format!("repository {}: source 'src' must not be empty", git),
            hint: None,
        });
    }
    match (&source.dst_file, &source.dst_dir) {
        (Some(_), Some(_)) => Err(Error::ConfigParse {
            message: format!(
                "repository {}: source '{}': 'dstFile' and 'dstDir' are mutually exclusive",
                git, source.src
            ),
            hint: None,
        }),
        (None, None) => Err(Error::ConfigParse {
            message: format!(
                "repository {}: source '{}': one of 'dstFile' or 'dstDir' is required",
                git, source.src
            ),
            hint: None,
        }),
        (None, Some(dst_dir)) => validate_dst_dir(git, dst_dir),
        _ => Ok(()),
    }
}

/// Destination directories are removed recursively before materialization,
/// so `.` and `..` would destroy the caller's tree.
fn validate_dst_dir(git: &str, dst_dir: &Path) -> Result<()> {
    if dst_dir == Path::new(".") || dst_dir == Path::new("..") {
        return Err(Error::ConfigParse {
            message: format!(
                "repository {}: 'dstDir' must not be '{}'",
                git,
                dst_dir.display()
            ),
            hint: Some("destination directories are replaced recursively".to_string()),
        });
    }
    Ok(())
}
