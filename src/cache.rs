//! # Clone Cache Scheduler
//!
//! Populates the on-disk clone cache: one bare clone per distinct Git URL,
//! no matter how many repositories reference that URL at different versions.
//! Versions are materialized later as separate worktrees off the shared
//! clone.
//!
//! ## Scheduling
//!
//! Clone/update operations run on a dedicated rayon pool whose size bounds
//! the number of fetches in flight: `min(8, available_parallelism)` when the
//! run is parallel, 1 otherwise. Deduplication uses a claim-then-fill
//! protocol on a single mutex-guarded map: a worker claims its URL by
//! inserting a placeholder while holding the lock, performs the long-running
//! fetch *outside* the lock, then re-acquires it to write the final clone
//! path. Workers that find their URL already claimed exit immediately.
//!
//! `populate` is a full barrier: it returns only once every worker has
//! finished, so materialization never overlaps cache population. Failures
//! are aggregated and the first one observed is surfaced; the rest are
//! logged and dropped.
//!
//! ## Cache validity
//!
//! A clone directory is only trusted if its remotes include our origin name.
//! Anything else (interrupted runs, manual tampering, a clone made by hand)
//! is discarded and re-cloned.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use rayon::prelude::*;

use crate::config::Repository;
use crate::defaults;
use crate::error::{Error, Result};
use crate::git::Git;
use crate::path::normalize_url;

/// Reclaim a mutex's contents, surfacing poisoning as an error instead of
/// panicking. Poisoning can only happen if a worker panicked mid-update.
fn unpoison<T>(mutex: Mutex<T>, context: &str) -> Result<T> {
    mutex.into_inner().map_err(|_| Error::LockPoisoned {
        context: context.to_string(),
    })
}

/// URL-keyed population of the on-disk clone cache.
pub struct CloneCache {
    git: Arc<dyn Git>,
    cache_dir: PathBuf,
}

impl CloneCache {
    pub fn new(git: Arc<dyn Git>, cache_dir: &Path) -> Self {
        Self {
            git,
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Number of clone/update operations allowed in flight.
    pub fn slots(parallel: bool) -> usize {
        if parallel {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
                .min(defaults::MAX_CLONE_SLOTS)
        } else {
            1
        }
    }

    /// The cache directory holding the clone for `url`.
    pub fn clone_dir(&self, url: &str) -> PathBuf {
        self.cache_dir.join(normalize_url(url))
    }

    /// Clone or update every distinct URL referenced by `repositories`,
    /// returning the URL → clone path map.
    ///
    /// Exactly one clone/update is performed per distinct URL. Any failure
    /// aborts the population phase; no partial map is returned.
    pub fn populate(
        &self,
        repositories: &[Repository],
        parallel: bool,
    ) -> Result<HashMap<String, PathBuf>> {
        let slots = Self::slots(parallel);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(slots)
            .build()
            .map_err(|e| Error::CacheAccess {
                path: self.cache_dir.display().to_string(),
                message: e.to_string(),
            })?;

        // None marks a URL claimed but not yet fetched.
        let clones: Mutex<HashMap<String, Option<PathBuf>>> = Mutex::new(HashMap::new());
        let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

        pool.install(|| {
            repositories.par_iter().for_each(|repo| {
                // Claim the URL under the lock; the long-running fetch runs
                // outside it. A poisoned lock means a sibling worker
                // panicked; nothing left for this one to do.
                {
                    let Ok(mut map) = clones.lock() else { return };
                    if map.contains_key(&repo.git) {
                        return;
                    }
                    map.insert(repo.git.clone(), None);
                }

                match self.fetch(&repo.git) {
                    Ok(clone_dir) => {
                        if let Ok(mut map) = clones.lock() {
                            map.insert(repo.git.clone(), Some(clone_dir));
                        }
                    }
                    Err(e) => {
                        if let Ok(mut errors) = errors.lock() {
                            errors.push(e);
                        }
                    }
                }
            });
        });

        let mut errors = unpoison(errors, "clone error list")?.into_iter();
        if let Some(first) = errors.next() {
            for later in errors {
                warn!("additional clone failure: {}", later);
            }
            return Err(first);
        }

        let mut populated = HashMap::new();
        for (url, clone_dir) in unpoison(clones, "clone cache map")? {
            match clone_dir {
                Some(clone_dir) => {
                    populated.insert(url, clone_dir);
                }
                None => return Err(Error::MissingClone { url }),
            }
        }
        Ok(populated)
    }

    /// Clone `url` into the cache, or update the clone already there.
    ///
    /// An existing directory that does not carry our origin remote is a
    /// stale or foreign cache entry and is discarded before re-cloning.
    fn fetch(&self, url: &str) -> Result<PathBuf> {
        let clone_dir = self.clone_dir(url);
        let git_error = |e: Error| Error::GitClone {
            url: url.to_string(),
            message: e.to_string(),
        };

        let valid = clone_dir.exists()
            && matches!(
                self.git.remote_exists(&clone_dir, defaults::ORIGIN_REMOTE),
                Ok(true)
            );

        if valid {
            info!("clone already exists clone_dir={}", clone_dir.display());
            self.git
                .update(defaults::ORIGIN_REMOTE, &clone_dir)
                .map_err(git_error)?;
        } else {
            if clone_dir.symlink_metadata().is_ok() {
                info!(
                    "remote does not exist in clone, invalidating cache remote={} clone_dir={}",
                    defaults::ORIGIN_REMOTE,
                    clone_dir.display()
                );
                fs::remove_dir_all(&clone_dir).map_err(|e| git_error(e.into()))?;
            }
            info!("cloning repository={} clone_dir={}", url, clone_dir.display());
            self.git
                .clone_bare(url, defaults::ORIGIN_REMOTE, &clone_dir)
                .map_err(git_error)?;
        }

        Ok(clone_dir)
    }
}
