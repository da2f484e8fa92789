//! Overlay command implementation
//!
//! Loads and validates the manifest, then hands the resulting configuration
//! to the engine: lock the cache, populate clones, materialize each
//! repository in manifest order, and run post-overlay commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use repo_overlay::config::{self, Config};
use repo_overlay::defaults;
use repo_overlay::overlay::Overlay;

/// Arguments for the overlay command
#[derive(Args, Debug)]
pub struct OverlayArgs {
    /// Path to the manifest file
    #[arg(short, long, value_name = "FILE", default_value = defaults::MANIFEST_FILE)]
    pub file: PathBuf,

    /// Clone cache directory
    #[arg(short, long, value_name = "DIR", env = "REPO_OVERLAY_DIR",
          default_value_os_t = defaults::default_cache_root())]
    pub dir: PathBuf,

    /// Clone and update repositories concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Do not run post-overlay commands
    #[arg(long)]
    pub skip_commands: bool,
}

/// Execute the `overlay` command.
pub fn execute(args: OverlayArgs) -> Result<()> {
    let repositories = config::load(&args.file)
        .with_context(|| format!("failed to load manifest {}", args.file.display()))?;

    let config = Config {
        cache_dir: args.dir,
        parallel: args.parallel,
        skip_commands: args.skip_commands,
        repositories,
    };
    Overlay::new(config).run()?;
    Ok(())
}
