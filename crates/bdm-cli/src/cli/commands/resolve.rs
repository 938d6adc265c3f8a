//! Resolve command: read the manifest and bring every dependency up to date.

use super::{directories, tool_version};
use crate::cli::LocationArgs;
use anyhow::Result;
use bdm_core::checksum::Sha256ChecksumCalculator;
use bdm_core::config::{ConfigurationReader, ToolSettings};
use bdm_core::downloader::{self, DownloaderKind};
use bdm_core::paths::PathResolver;
use bdm_core::resolver::DependenciesResolver;
use bdm_core::unarchiver::ZipUnarchiver;

pub fn run_resolve(
    locations: &LocationArgs,
    kind_override: Option<DownloaderKind>,
    settings: &ToolSettings,
) -> Result<()> {
    let reader = ConfigurationReader::from_current_dir()?;
    let manifest = reader.read_manifest(locations.config_path(), &tool_version()?)?;
    let (output_dir, cache_dir) = directories(&reader, locations, Some(&manifest));

    let kind = kind_override.unwrap_or(settings.downloader);
    tracing::debug!(
        "resolving into {} (cache {}) with the {} downloader",
        output_dir.display(),
        cache_dir.display(),
        kind
    );

    let mut resolver = DependenciesResolver::new(
        manifest.dependencies,
        PathResolver::new(output_dir, cache_dir),
        downloader::build(kind, &settings.github_api_url)?,
        Box::new(ZipUnarchiver),
        Box::new(Sha256ChecksumCalculator),
    );
    if let Some(temp_parent) = &settings.temp_directory {
        resolver = resolver.with_temp_parent(temp_parent);
    }

    let summary = resolver.run()?;
    tracing::info!(
        "[Resolve] {} dependencies resolved ({} assets), {} up to date",
        summary.dependencies_resolved,
        summary.assets_resolved,
        summary.dependencies_skipped
    );
    Ok(())
}
