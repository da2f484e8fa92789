//! Init command implementation
//!
//! Creates a starter `overlay.yaml` manifest in the current directory so a
//! new project does not have to write the schema from scratch. The starter
//! contains one blank repository entry for the user to fill in; it is built
//! from the same serde types the parser consumes, so the two can never
//! drift apart.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use repo_overlay::config::Repository;
use repo_overlay::defaults;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path of the manifest file to create
    #[arg(short, long, value_name = "FILE", default_value = defaults::MANIFEST_FILE)]
    pub file: PathBuf,

    /// Overwrite an existing manifest file
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
struct StarterManifest {
    repositories: Vec<Repository>,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs) -> Result<()> {
    if args.file.exists() && !args.force {
        anyhow::bail!(
            "manifest '{}' already exists, use --force to overwrite",
            args.file.display()
        );
    }

    let starter = StarterManifest {
        repositories: vec![Repository {
            git: String::new(),
            version: String::new(),
            dst_dir: Some(PathBuf::new()),
            sources: vec![],
            commands: vec![],
        }],
    };
    let yaml = serde_yaml::to_string(&starter)?;
    fs::write(&args.file, yaml)?;

    println!("wrote {}", args.file.display());
    Ok(())
}
