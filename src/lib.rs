//! # Repo Overlay Library
//!
//! This library provides the core functionality for vendoring files and
//! directories from remote git repositories into a local working tree. It is
//! designed to be used by the `repo-overlay` command-line tool but can also be
//! embedded in other applications that need pinned-version git overlays.
//!
//! ## Quick Example
//!
//! ```
//! use repo_overlay::config;
//! use repo_overlay::path;
//!
//! let yaml = r#"
//! repositories:
//!   - git: https://github.com/example/scripts.git
//!     version: v1.2.0
//!     dstDir: vendor/scripts
//! "#;
//! let repositories = config::parse(yaml).unwrap();
//! assert_eq!(repositories.len(), 1);
//!
//! // Each repository URL maps to a stable cache directory name.
//! let name = path::normalize_url(&repositories[0].git);
//! assert_eq!(name, "https---github.com-example-scripts.git");
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Configuration (`config`)**: Defines the schema for `overlay.yaml`
//!   manifests and validates them before any git traffic happens.
//! - **Clone Cache (`cache`)**: A shared directory of bare clones, keyed by
//!   normalized URL, populated concurrently with per-URL deduplication.
//! - **Locking (`lock`)**: A cross-process lock file that serializes whole
//!   runs against the same cache directory.
//! - **Materialization (`repository`, `git`, `copy`)**: Checks pinned
//!   versions out of the cache via detached worktrees, either into a
//!   destination directory wholesale or as glob-selected subtrees.
//! - **Orchestration (`overlay`)**: Ties the phases together and runs any
//!   declared post-overlay commands.
//!
//! ## Execution Flow
//!
//! The main entry point is `overlay::Overlay::run`, which executes the
//! following high-level steps:
//!
//! 1.  **Lock**: Acquire the cache-wide lock file, failing fast if another
//!     run holds it.
//! 2.  **Populate**: Clone or update every distinct repository URL, in
//!     parallel when requested, deduplicating shared URLs.
//! 3.  **Materialize**: For each manifest entry, in order, check out the
//!     pinned version and copy it (or selected globs) into its destination.
//! 4.  **Commands**: Run each repository's post-overlay commands.

pub mod cache;
pub mod config;
pub mod copy;
pub mod defaults;
pub mod error;
pub mod exec;
pub mod git;
pub mod lock;
pub mod overlay;
pub mod path;
pub mod repository;

#[cfg(test)]
mod path_proptest;
