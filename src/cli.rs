//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Repo Overlay - Vendor files and directories from remote git repositories
#[derive(Parser, Debug)]
#[command(name = "repo-overlay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Overlay the configured repositories into the working tree
    Overlay(commands::overlay::OverlayArgs),

    /// Create a starter manifest in the current directory
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .filter_level(self.log_level)
            .format_timestamp(None)
            .init();

        match self.command {
            Commands::Overlay(args) => commands::overlay::execute(args),
            Commands::Init(args) => commands::init::execute(args),
        }
    }
}
