//! CLI for the binary dependencies manager.

mod commands;

use anyhow::Result;
use bdm_core::config;
use bdm_core::downloader::DownloaderKind;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use commands::{run_checksum, run_clean, run_resolve};

/// Top-level CLI for bdm.
#[derive(Debug, Parser)]
#[command(name = "bdm", version)]
#[command(
    about = "bdm: fetch prebuilt binary dependencies from GitHub releases",
    long_about = None
)]
pub struct Cli {
    /// Write logs to the state log file (~/.local/state/bdm/bdm.log) instead of stderr.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Where the manifest lives and where its dependencies go.
#[derive(Debug, Clone, Default, Args)]
pub struct LocationArgs {
    /// Manifest file (default: .binary-dependencies.yaml, .binary-dependencies.yml
    /// or Dependencies.json).
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output directory for resolved dependencies.
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Cache directory for downloaded archives.
    #[arg(long = "cache", value_name = "DIR")]
    pub cache: Option<PathBuf>,
}

impl LocationArgs {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download and unpack every dependency of the manifest that is not up to date.
    Resolve {
        #[command(flatten)]
        locations: LocationArgs,

        /// Downloader backend (overrides the settings file).
        #[arg(long, value_name = "gh|http")]
        downloader: Option<DownloaderKind>,
    },

    /// Remove the output and cache directories.
    Clean {
        #[command(flatten)]
        locations: LocationArgs,
    },

    /// Compute SHA-256 of a file (the value to put in `checksum`).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Resolve {
                locations,
                downloader,
            } => {
                let settings = config::load_or_init()?;
                tracing::debug!("loaded settings: {:?}", settings);
                run_resolve(&locations, downloader, &settings)?;
            }
            CliCommand::Clean { locations } => run_clean(&locations)?,
            CliCommand::Checksum { path } => run_checksum(Path::new(&path))?,
        }

        Ok(())
    }
}
