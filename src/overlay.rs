//! # Overlay Orchestrator
//!
//! The `Overlay` type owns a full run: it resolves the cache directory,
//! takes the cross-process lock, populates the clone cache, materializes
//! every repository in manifest order, and runs declared post-commands.
//!
//! ## Sequencing
//!
//! Cache population is a full barrier: no repository is materialized until
//! every clone/update has finished. Materialization itself is sequential and
//! ordered; destinations may overlap between repositories, so later entries
//! deliberately win. A failure anywhere aborts the remainder of the run;
//! state already written to destinations is not rolled back.
//!
//! The Git and Exec collaborators are injected, one production
//! implementation each and recording mocks in tests, so the orchestration
//! logic is exercised without a git binary or child processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::cache::CloneCache;
use crate::config::{Config, Repository};
use crate::error::{Error, Result};
use crate::exec::{Exec, SystemExec};
use crate::git::{Git, SystemGit};
use crate::lock;
use crate::path::expand_user;
use crate::repository::Materializer;

/// A configured overlay run.
pub struct Overlay {
    config: Config,
    git: Arc<dyn Git>,
    exec: Arc<dyn Exec>,
}

impl Overlay {
    /// Create an overlay run with the production Git and Exec
    /// implementations.
    pub fn new(config: Config) -> Self {
        let exec: Arc<dyn Exec> = Arc::new(SystemExec);
        let git: Arc<dyn Git> = Arc::new(SystemGit::new(exec.clone()));
        Self { config, git, exec }
    }

    /// Create an overlay run with custom Git and Exec implementations.
    ///
    /// This is primarily used to inject mocks in tests.
    pub fn with_managers(config: Config, git: Arc<dyn Git>, exec: Arc<dyn Exec>) -> Self {
        Self { config, git, exec }
    }

    /// Execute the overlay: populate the clone cache, then materialize each
    /// repository and run its post-commands.
    ///
    /// The whole run holds the cache lock; a second concurrent run against
    /// the same cache directory fails with `Error::LockHeld`.
    pub fn run(&self) -> Result<()> {
        let cache_dir = self.cache_dir()?;
        lock::with_lock(&cache_dir, || self.overlay_repositories(&cache_dir))
    }

    /// Expand and create the cache directory.
    fn cache_dir(&self) -> Result<PathBuf> {
        let dir = expand_user(&self.config.cache_dir)?;
        fs::create_dir_all(&dir).map_err(|e| Error::CacheAccess {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(dir)
    }

    fn overlay_repositories(&self, cache_dir: &Path) -> Result<()> {
        debug!(
            "current configuration cache_dir={} parallel={} skip_commands={} repositories={}",
            cache_dir.display(),
            self.config.parallel,
            self.config.skip_commands,
            self.config.repositories.len()
        );

        let cache = CloneCache::new(self.git.clone(), cache_dir);
        let clones = cache.populate(&self.config.repositories, self.config.parallel)?;

        let materializer = Materializer::new(self.git.clone());
        for repo in &self.config.repositories {
            let clone_dir = clones.get(&repo.git).ok_or_else(|| Error::MissingClone {
                url: repo.git.clone(),
            })?;
            materializer.materialize(repo, clone_dir, cache_dir)?;

            if !self.config.skip_commands {
                self.run_commands(repo)?;
            }
        }

        Ok(())
    }

    fn run_commands(&self, repo: &Repository) -> Result<()> {
        for command in &repo.commands {
            info!(
                "running command repository={} cmd={} args={:?}",
                repo.git, command.cmd, command.args
            );
            self.exec.run_cmd(&command.cmd, &command.args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::config::Command;
    use crate::defaults;

    fn config(cache_dir: &Path, repositories: Vec<Repository>) -> Config {
        Config {
            cache_dir: cache_dir.to_path_buf(),
            parallel: false,
            skip_commands: false,
            repositories,
        }
    }

    fn worktree_repo(url: &str, version: &str, dst: &Path) -> Repository {
        Repository {
            git: url.to_string(),
            version: version.to_string(),
            dst_dir: Some(dst.to_path_buf()),
            sources: vec![],
            commands: vec![],
        }
    }

    /// Mock git that records clone and worktree calls and writes a marker
    /// file into each worktree it creates.
    struct RecordingGit {
        clone_calls: Arc<Mutex<Vec<String>>>,
        worktree_calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
        fail_clones: bool,
    }

    impl RecordingGit {
        fn new() -> Self {
            Self {
                clone_calls: Arc::new(Mutex::new(Vec::new())),
                worktree_calls: Arc::new(Mutex::new(Vec::new())),
                fail_clones: false,
            }
        }

        fn with_failing_clones() -> Self {
            Self {
                fail_clones: true,
                ..Self::new()
            }
        }
    }

    impl Git for RecordingGit {
        fn clone_bare(&self, url: &str, _origin: &str, clone_dir: &Path) -> Result<()> {
            self.clone_calls.lock().unwrap().push(url.to_string());
            if self.fail_clones {
                return Err(Error::CommandFailed {
                    command: "git clone".to_string(),
                    message: "exit status 128".to_string(),
                });
            }
            fs::create_dir_all(clone_dir)?;
            Ok(())
        }

        fn update(&self, _origin: &str, _clone_dir: &Path) -> Result<()> {
            Ok(())
        }

        fn worktree(&self, _clone_dir: &Path, version: &str, dst_dir: &Path) -> Result<()> {
            self.worktree_calls
                .lock()
                .unwrap()
                .push((version.to_string(), dst_dir.to_path_buf()));
            fs::create_dir_all(dst_dir)?;
            fs::write(dst_dir.join("checked-out"), version)?;
            Ok(())
        }

        fn remote_exists(&self, _clone_dir: &Path, _origin: &str) -> Result<bool> {
            Ok(true)
        }
    }

    /// Mock exec that records commands and can fail a specific one.
    struct RecordingExec {
        calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
        fail_cmd: Option<String>,
    }

    impl RecordingExec {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail_cmd: None,
            }
        }

        fn failing_on(cmd: &str) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail_cmd: Some(cmd.to_string()),
            }
        }
    }

    impl Exec for RecordingExec {
        fn run_cmd(&self, name: &str, args: &[String]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), args.to_vec()));
            if self.fail_cmd.as_deref() == Some(name) {
                return Err(Error::CommandFailed {
                    command: name.to_string(),
                    message: "exit status 1".to_string(),
                });
            }
            Ok(String::new())
        }

        fn run_cmd_in_dir(&self, name: &str, args: &[String], _cwd: &Path) -> Result<String> {
            self.run_cmd(name, args)
        }
    }

    #[test]
    fn test_run_shared_url_clones_once_materializes_twice() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let dst_v1 = tmp.path().join("v1");
        let dst_v2 = tmp.path().join("v2");

        let git = Arc::new(RecordingGit::new());
        let clone_calls = git.clone_calls.clone();
        let worktree_calls = git.worktree_calls.clone();

        let overlay = Overlay::with_managers(
            config(
                &cache_dir,
                vec![
                    worktree_repo("https://x/repo.git", "v1", &dst_v1),
                    worktree_repo("https://x/repo.git", "v2", &dst_v2),
                ],
            ),
            git,
            Arc::new(RecordingExec::new()),
        );
        overlay.run().unwrap();

        assert_eq!(clone_calls.lock().unwrap().len(), 1);
        let worktrees = worktree_calls.lock().unwrap();
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[0].0, "v1");
        assert_eq!(worktrees[1].0, "v2");
        assert_eq!(fs::read_to_string(dst_v1.join("checked-out")).unwrap(), "v1");
        assert_eq!(fs::read_to_string(dst_v2.join("checked-out")).unwrap(), "v2");
    }

    #[test]
    fn test_run_materializes_in_manifest_order() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let git = Arc::new(RecordingGit::new());
        let worktree_calls = git.worktree_calls.clone();

        let overlay = Overlay::with_managers(
            config(
                &cache_dir,
                vec![
                    worktree_repo("https://x/b.git", "v1", &tmp.path().join("b")),
                    worktree_repo("https://x/a.git", "v1", &tmp.path().join("a")),
                    worktree_repo("https://x/c.git", "v1", &tmp.path().join("c")),
                ],
            ),
            git,
            Arc::new(RecordingExec::new()),
        );
        overlay.run().unwrap();

        let worktrees = worktree_calls.lock().unwrap();
        let dsts: Vec<_> = worktrees
            .iter()
            .map(|(_, dst)| dst.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(dsts, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_run_clone_failure_blocks_all_materialization() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let git = Arc::new(RecordingGit::with_failing_clones());
        let worktree_calls = git.worktree_calls.clone();

        let overlay = Overlay::with_managers(
            config(
                &cache_dir,
                vec![worktree_repo(
                    "https://x/repo.git",
                    "v1",
                    &tmp.path().join("dst"),
                )],
            ),
            git,
            Arc::new(RecordingExec::new()),
        );
        let error = overlay.run().unwrap_err();

        assert!(matches!(error, Error::GitClone { .. }));
        assert!(worktree_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_executes_commands_in_declared_order() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let mut repo = worktree_repo("https://x/repo.git", "v1", &tmp.path().join("dst"));
        repo.commands = vec![
            Command {
                cmd: "first".to_string(),
                args: vec!["--flag".to_string()],
            },
            Command {
                cmd: "second".to_string(),
                args: vec![],
            },
        ];

        let exec = Arc::new(RecordingExec::new());
        let calls = exec.calls.clone();
        let overlay = Overlay::with_managers(
            config(&cache_dir, vec![repo]),
            Arc::new(RecordingGit::new()),
            exec,
        );
        overlay.run().unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "first");
        assert_eq!(calls[0].1, vec!["--flag"]);
        assert_eq!(calls[1].0, "second");
    }

    #[test]
    fn test_run_skip_commands() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let mut repo = worktree_repo("https://x/repo.git", "v1", &tmp.path().join("dst"));
        repo.commands = vec![Command {
            cmd: "never-run".to_string(),
            args: vec![],
        }];

        let exec = Arc::new(RecordingExec::new());
        let calls = exec.calls.clone();
        let mut cfg = config(&cache_dir, vec![repo]);
        cfg.skip_commands = true;

        let overlay = Overlay::with_managers(cfg, Arc::new(RecordingGit::new()), exec);
        overlay.run().unwrap();

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_command_failure_aborts_remaining_repositories() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let mut first = worktree_repo("https://x/first.git", "v1", &tmp.path().join("first"));
        first.commands = vec![
            Command {
                cmd: "breaks".to_string(),
                args: vec![],
            },
            Command {
                cmd: "after-failure".to_string(),
                args: vec![],
            },
        ];
        let second = worktree_repo("https://x/second.git", "v1", &tmp.path().join("second"));

        let git = Arc::new(RecordingGit::new());
        let worktree_calls = git.worktree_calls.clone();
        let exec = Arc::new(RecordingExec::failing_on("breaks"));
        let calls = exec.calls.clone();

        let overlay = Overlay::with_managers(config(&cache_dir, vec![first, second]), git, exec);
        let error = overlay.run().unwrap_err();

        assert!(matches!(error, Error::CommandFailed { .. }));
        // The remaining command never ran
        assert_eq!(calls.lock().unwrap().len(), 1);
        // The second repository was never materialized
        assert_eq!(worktree_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_run_fails_fast_when_lock_is_held() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::write(cache_dir.join(defaults::LOCK_FILE), b"12345\n").unwrap();

        let git = Arc::new(RecordingGit::new());
        let clone_calls = git.clone_calls.clone();

        let overlay = Overlay::with_managers(
            config(
                &cache_dir,
                vec![worktree_repo(
                    "https://x/repo.git",
                    "v1",
                    &tmp.path().join("dst"),
                )],
            ),
            git,
            Arc::new(RecordingExec::new()),
        );
        let error = overlay.run().unwrap_err();

        assert!(matches!(error, Error::LockHeld { .. }));
        assert!(clone_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_run_releases_lock_on_failure() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let overlay = Overlay::with_managers(
            config(
                &cache_dir,
                vec![worktree_repo(
                    "https://x/repo.git",
                    "v1",
                    &tmp.path().join("dst"),
                )],
            ),
            Arc::new(RecordingGit::with_failing_clones()),
            Arc::new(RecordingExec::new()),
        );
        assert!(overlay.run().is_err());

        assert!(!cache_dir.join(defaults::LOCK_FILE).exists());
    }

    #[test]
    fn test_run_creates_cache_directory() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("nested/cache");

        let overlay = Overlay::with_managers(
            config(&cache_dir, vec![]),
            Arc::new(RecordingGit::new()),
            Arc::new(RecordingExec::new()),
        );
        overlay.run().unwrap();

        assert!(cache_dir.is_dir());
    }
}
