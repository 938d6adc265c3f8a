//! Deterministic on-disk locations for a (dependency, asset) pair.
//!
//! Everything here is a pure function of the inputs and the two roots; nothing
//! touches the filesystem.

use crate::model::{Asset, Dependency};
use crate::resolver::ResolveError;
use std::path::{Path, PathBuf};

/// Name of the download cache directory under the cache root.
pub const DOWNLOADS_DIR: &str = ".downloads";

/// Maps dependencies and assets to download, output and marker paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    output_root: PathBuf,
    cache_root: PathBuf,
}

impl PathResolver {
    pub fn new(output_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            cache_root: cache_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// `<cache_root>/.downloads`
    pub fn downloads_root(&self) -> PathBuf {
        self.cache_root.join(DOWNLOADS_DIR)
    }

    /// `<cache_root>/.downloads/<repo>/<tag>/<output?>`
    pub fn download_directory(&self, dependency: &Dependency, asset: &Asset) -> PathBuf {
        join_segments(
            &self.downloads_root(),
            &[
                dependency.repo.as_str(),
                dependency.tag.as_str(),
                asset.output_directory.as_deref().unwrap_or(""),
            ],
        )
    }

    /// `<download_directory>/<checksum>.zip`
    pub fn download_file(&self, dependency: &Dependency, asset: &Asset) -> PathBuf {
        self.download_directory(dependency, asset)
            .join(format!("{}.zip", asset.checksum))
    }

    /// `<output_root>/<repo>/<output?>`
    pub fn output_directory(&self, dependency: &Dependency, asset: &Asset) -> PathBuf {
        join_segments(
            &self.output_root,
            &[
                dependency.repo.as_str(),
                asset.output_directory.as_deref().unwrap_or(""),
            ],
        )
    }

    /// `<output_directory>/.<sanitized pattern_contents>.hash`
    ///
    /// Fails when the asset has neither a usable `pattern` nor `contents`.
    pub fn marker_file(
        &self,
        dependency: &Dependency,
        asset: &Asset,
    ) -> Result<PathBuf, ResolveError> {
        let name = marker_name(asset).ok_or_else(|| ResolveError::PathDerivation {
            repo: dependency.repo.clone(),
            checksum: asset.checksum.clone(),
        })?;
        Ok(self
            .output_directory(dependency, asset)
            .join(format!(".{}.hash", name)))
    }
}

/// Joins `pattern` and `contents` with `_` and replaces every non-alphanumeric
/// character with `_`. Returns `None` when the result would be empty.
pub fn marker_name(asset: &Asset) -> Option<String> {
    let joined = [asset.pattern.as_deref(), asset.contents.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        return None;
    }
    Some(
        joined
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect(),
    )
}

/// Appends segments to `base`, skipping empty ones so no trailing separator is produced.
fn join_segments(base: &Path, segments: &[&str]) -> PathBuf {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, s| acc.join(s))
}
