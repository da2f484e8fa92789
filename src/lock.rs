//! # Cross-Process Lock
//!
//! A single advisory lock file serializes whole overlay runs across
//! processes sharing the same cache directory. The protected resource is the
//! shared clone cache: two concurrent runs could otherwise fetch into the
//! same clone directories or tear down each other's transient worktrees.
//!
//! Acquisition is non-blocking: if another process holds the lock, the run
//! fails immediately with `Error::LockHeld` rather than queueing. The lock
//! spans the entire run (cache population, materialization, and
//! post-commands) and is released on every exit path, including panics,
//! via `Drop`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::defaults;
use crate::error::{Error, Result};

/// An acquired lock file, removed when dropped.
///
/// The file holds the owning process id for diagnosis; nothing reads it back
/// programmatically.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Try to acquire the lock at `path` without blocking.
    ///
    /// Creation with `create_new` is atomic on every filesystem we care
    /// about: exactly one contender observes success.
    pub fn acquire(path: &Path) -> Result<Self> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::LockHeld {
                path: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        debug!("releasing lock lockfile={}", self.path.display());
        let _ = fs::remove_file(&self.path);
    }
}

/// Ensure `cache_dir` exists, then run `f` while holding the overlay lock.
///
/// The lock is released when `f` returns, whatever the outcome.
pub fn with_lock<T, F>(cache_dir: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    fs::create_dir_all(cache_dir).map_err(|e| Error::CacheAccess {
        path: cache_dir.display().to_string(),
        message: e.to_string(),
    })?;

    let lock_path = cache_dir.join(defaults::LOCK_FILE);
    info!("acquiring lock lockfile={}", lock_path.display());

    let _lock = LockFile::acquire(&lock_path)?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_lock_file_with_pid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overlay.lock");

        let lock = LockFile::acquire(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.trim().parse::<u32>().unwrap(),
            std::process::id()
        );
        drop(lock);
    }

    #[test]
    fn test_acquire_twice_is_lock_held() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overlay.lock");

        let _lock = LockFile::acquire(&path).unwrap();
        let second = LockFile::acquire(&path);
        assert!(matches!(second, Err(Error::LockHeld { .. })));
    }

    #[test]
    fn test_drop_releases_lock() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("overlay.lock");

        let lock = LockFile::acquire(&path).unwrap();
        drop(lock);

        assert!(!path.exists());
        // Reacquirable after release
        let _lock = LockFile::acquire(&path).unwrap();
    }

    #[test]
    fn test_with_lock_creates_cache_dir_and_runs() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let value = with_lock(&cache_dir, || Ok(42)).unwrap();
        assert_eq!(value, 42);
        assert!(cache_dir.is_dir());
        assert!(!cache_dir.join(defaults::LOCK_FILE).exists());
    }

    #[test]
    fn test_with_lock_releases_on_error() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().to_path_buf();

        let result: Result<()> = with_lock(&cache_dir, || {
            Err(Error::ConfigParse {
                message: "boom".to_string(),
                hint: None,
            })
        });
        assert!(result.is_err());
        assert!(!cache_dir.join(defaults::LOCK_FILE).exists());
    }

    #[test]
    fn test_with_lock_held_by_other_process_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().to_path_buf();
        // Simulate a foreign holder
        fs::write(cache_dir.join(defaults::LOCK_FILE), b"12345\n").unwrap();

        let result: Result<()> = with_lock(&cache_dir, || Ok(()));
        assert!(matches!(result, Err(Error::LockHeld { .. })));
        // The foreign lock file is left untouched
        assert!(cache_dir.join(defaults::LOCK_FILE).exists());
    }

    #[test]
    fn test_with_lock_released_even_on_panic() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().to_path_buf();

        let result = std::panic::catch_unwind({
            let cache_dir = cache_dir.clone();
            move || {
                let _: Result<()> = with_lock(&cache_dir, || panic!("worker blew up"));
            }
        });
        assert!(result.is_err());
        assert!(!cache_dir.join(defaults::LOCK_FILE).exists());
    }
}
