//! CLI command handlers, one per file.

mod checksum;
mod clean;
mod resolve;

pub use checksum::run_checksum;
pub use clean::run_clean;
pub use resolve::run_resolve;

use super::LocationArgs;
use anyhow::{Context, Result};
use bdm_core::config::{ConfigurationReader, Manifest};
use semver::Version;
use std::path::{Path, PathBuf};

/// Version of this binary, compared against the manifest's `minimumVersion`.
pub(crate) fn tool_version() -> Result<Version> {
    Version::parse(env!("CARGO_PKG_VERSION")).context("invalid package version")
}

/// Output and cache directories: flag, then manifest value, then the reader's defaults.
pub(crate) fn directories(
    reader: &ConfigurationReader,
    locations: &LocationArgs,
    manifest: Option<&Manifest>,
) -> (PathBuf, PathBuf) {
    let output = locations
        .output
        .as_deref()
        .or_else(|| manifest.and_then(|m| m.output_directory.as_deref()).map(Path::new));
    let cache = locations
        .cache
        .as_deref()
        .or_else(|| manifest.and_then(|m| m.cache_directory.as_deref()).map(Path::new));
    (
        reader.resolve_output_directory(output),
        reader.resolve_cache_directory(cache),
    )
}
