//! Locating and reading the project manifest.

use super::manifest::{Manifest, ManifestFormat};
use anyhow::{bail, Context, Result};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_MANIFEST_FILENAMES: &[&str] = &[
    ".binary-dependencies.yaml",
    ".binary-dependencies.yml",
    "Dependencies.json",
];

const DEFAULT_OUTPUT_DIRECTORIES: &[&str] = &["Dependencies/Binary", "Dependencies"];

const DEFAULT_CACHE_DIRECTORIES: &[&str] = &[
    ".cache/binary-dependencies",
    ".cache/dependencies",
    ".dependencies-cache",
];

/// Resolves manifest, output and cache locations relative to a project directory.
#[derive(Debug, Clone)]
pub struct ConfigurationReader {
    base_dir: PathBuf,
}

impl ConfigurationReader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Reader rooted at the current working directory.
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// The explicit path if given, else the first existing candidate, else the first candidate.
    fn resolve_path(&self, explicit: Option<&Path>, candidates: &[&str]) -> PathBuf {
        if let Some(path) = explicit {
            return self.base_dir.join(path);
        }
        candidates
            .iter()
            .map(|c| self.base_dir.join(c))
            .find(|p| p.exists())
            .unwrap_or_else(|| self.base_dir.join(candidates[0]))
    }

    /// Manifest location; errors when no manifest file exists.
    pub fn resolve_manifest_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = self.resolve_path(explicit, DEFAULT_MANIFEST_FILENAMES);
        if !path.is_file() {
            bail!("No configuration file found (looked for {})", path.display());
        }
        Ok(path)
    }

    pub fn resolve_output_directory(&self, explicit: Option<&Path>) -> PathBuf {
        self.resolve_path(explicit, DEFAULT_OUTPUT_DIRECTORIES)
    }

    pub fn resolve_cache_directory(&self, explicit: Option<&Path>) -> PathBuf {
        self.resolve_path(explicit, DEFAULT_CACHE_DIRECTORIES)
    }

    /// Reads and decodes the manifest, then checks its minimum tool version.
    pub fn read_manifest(
        &self,
        explicit: Option<&Path>,
        tool_version: &Version,
    ) -> Result<Manifest> {
        let path = self.resolve_manifest_path(explicit)?;
        let data = fs::read_to_string(&path).with_context(|| {
            format!(
                "Can't get contents of configuration file at {}",
                path.display()
            )
        })?;
        let manifest = Manifest::parse(&data, ManifestFormat::from_path(&path))
            .with_context(|| format!("invalid configuration file {}", path.display()))?;

        check_minimum_version(&manifest, tool_version).with_context(|| path.display().to_string())?;

        let listing = manifest
            .dependencies
            .iter()
            .map(|d| format!("   {}({})", d.repo, d.tag))
            .collect::<Vec<_>>()
            .join("\n");
        tracing::info!(
            "[Read] Found {} dependencies:\n{}",
            manifest.dependencies.len(),
            listing
        );
        Ok(manifest)
    }
}

/// Fails when the manifest requires a newer tool than `tool_version`.
pub fn check_minimum_version(manifest: &Manifest, tool_version: &Version) -> Result<()> {
    if let Some(required) = &manifest.minimum_version {
        if tool_version < required {
            bail!(
                "requires version '{}', but current version '{}' is lower",
                required,
                tool_version
            );
        }
    }
    Ok(())
}
