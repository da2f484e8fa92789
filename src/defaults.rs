//! Default values for repo-overlay configuration.
//!
//! This module provides centralized default values used across the engine
//! and CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Default manifest file name, looked up in the current directory.
pub const MANIFEST_FILE: &str = "overlay.yaml";

/// Name of the advisory lock file placed in the cache directory.
pub const LOCK_FILE: &str = "overlay.lock";

/// Remote name registered on every cached clone.
///
/// A clone in the cache directory whose remotes do not include this name was
/// not created by us and is discarded and re-cloned.
pub const ORIGIN_REMOTE: &str = "overlay";

/// Prefix for transient worktree directories created under the cache root.
pub const TMP_PREFIX: &str = "tmp-";

/// Upper bound on concurrent clone/update operations.
pub const MAX_CLONE_SLOTS: usize = 8;

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/repo-overlay` (XDG Base Directory)
/// - macOS: `~/Library/Caches/repo-overlay`
/// - Windows: `{FOLDERID_LocalAppData}\repo-overlay`
///
/// Falls back to `.repo-overlay-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--dir` CLI flag or the
/// `REPO_OVERLAY_DIR` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".repo-overlay-cache"))
        .join("repo-overlay")
}
