//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `repo-overlay`. It uses the `thiserror` library to create a comprehensive
//! `Error` enum that covers all anticipated failure modes, providing clear
//! and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur during an overlay run. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the crate to simplify function signatures.
//!
//! The variants map to the distinct phases of a run: configuration parsing
//! and validation, cache directory access, lock acquisition, Git clone and
//! update, worktree extraction, glob expansion, filesystem copies, and
//! post-command execution.

use thiserror::Error;

/// Main error type for repo-overlay operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing or validating the overlay manifest.
    ///
    /// Includes the specific issue and optionally a hint about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The cache directory could not be resolved or created.
    #[error("Cache directory error for {path}: {message}")]
    CacheAccess { path: String, message: String },

    /// Another overlay run holds the lock on the shared cache directory.
    #[error("Could not acquire lock on {path}: held by another process")]
    LockHeld { path: String },

    /// An error occurred while cloning or updating a Git repository.
    #[error("Git clone error for {url}: {message}")]
    GitClone { url: String, message: String },

    /// An external command exited non-zero or could not be started.
    #[error("Command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// A worktree could not be created at the requested revision.
    #[error("Worktree error at {version} into {path}: {message}")]
    Worktree {
        version: String,
        path: String,
        message: String,
    },

    /// A file or directory copy failed.
    #[error("Copy error: {src} -> {dst}: {message}")]
    Copy {
        src: String,
        dst: String,
        message: String,
    },

    /// The clone cache has no entry for a repository that should have one.
    #[error("No cached clone for {url}")]
    MissingClone { url: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
