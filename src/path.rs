//! Path manipulation utilities for repo-overlay

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expand a leading `~` in a path to the user's home directory.
///
/// Paths that do not start with `~` are returned unchanged. A bare `~` maps
/// to the home directory itself.
pub fn expand_user<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();

    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = dirs::home_dir().ok_or_else(|| Error::CacheAccess {
        path: path.display().to_string(),
        message: "could not determine home directory".to_string(),
    })?;

    Ok(home.join(rest))
}

/// Normalize a Git URL into a filesystem-safe directory name.
///
/// Replaces path separators and scheme delimiters so the result can be used
/// as a single path component. Two distinct URLs may in principle collide
/// only if they already differ solely by `/` vs `:`, which no valid pair of
/// Git URLs does.
pub fn normalize_url(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '/' | ':' | '\\' => '-',
            c => c,
        })
        .collect()
}
