//! Resolution engine: brings each declared asset into the output tree.
//!
//! Per asset the engine runs download → unzip → mark, each step guarded by its
//! own idempotence check. The marker file next to the output (content = the
//! asset checksum) is the only persisted state consulted on the next run; a
//! cached archive whose checksum still matches additionally skips the network.
//!
//! Everything runs sequentially and the first error aborts the run. The
//! extraction temp root is shared by all assets of a run and removed after
//! each extraction, so extraction must stay sequential unless the temp
//! directory is made per-asset first.

mod error;

pub use error::ResolveError;

use crate::checksum::ChecksumCalculator;
use crate::downloader::Downloader;
use crate::fs_ops;
use crate::model::{Asset, Dependency};
use crate::paths::PathResolver;
use crate::unarchiver::Unarchiver;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default directory name for extraction temp roots under the system temp dir.
pub const PRIVATE_DOWNLOADS_DIR: &str = "PrivateDownloads";

/// Counts reported by a successful [`DependenciesResolver::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub dependencies_resolved: usize,
    pub dependencies_skipped: usize,
    pub assets_resolved: usize,
    pub assets_skipped: usize,
}

/// Resolves a list of dependencies into the output tree.
pub struct DependenciesResolver {
    dependencies: Vec<Dependency>,
    paths: PathResolver,
    temp_root: PathBuf,
    run_id: String,
    downloader: Box<dyn Downloader>,
    unarchiver: Box<dyn Unarchiver>,
    checksum: Box<dyn ChecksumCalculator>,
}

impl DependenciesResolver {
    pub fn new(
        dependencies: Vec<Dependency>,
        paths: PathResolver,
        downloader: Box<dyn Downloader>,
        unarchiver: Box<dyn Unarchiver>,
        checksum: Box<dyn ChecksumCalculator>,
    ) -> Self {
        Self {
            dependencies,
            paths,
            temp_root: std::env::temp_dir().join(PRIVATE_DOWNLOADS_DIR),
            run_id: uuid::Uuid::new_v4().to_string(),
            downloader,
            unarchiver,
            checksum,
        }
    }

    /// Places the extraction temp root at `<parent>/PrivateDownloads`. Only that
    /// subdirectory is ever removed; the rest of `parent` is left alone.
    pub fn with_temp_parent(mut self, parent: impl AsRef<Path>) -> Self {
        self.temp_root = parent.as_ref().join(PRIVATE_DOWNLOADS_DIR);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Resolves every dependency. Work is planned in one pass up front, then
    /// executed strictly in order; the first failure aborts the run.
    pub fn run(&self) -> Result<ResolveSummary> {
        let mut summary = ResolveSummary::default();
        let mut pending = Vec::new();
        for dependency in &self.dependencies {
            match self.pending_assets(dependency)? {
                Some(todo) => {
                    summary.assets_skipped += dependency.assets.len() - todo.assets.len();
                    pending.push(todo);
                }
                None => {
                    summary.dependencies_skipped += 1;
                    summary.assets_skipped += dependency.assets.len();
                }
            }
        }

        for dependency in &pending {
            stage(format!("Resolving {}", dependency.repo), || {
                self.resolve_assets(dependency)
            })?;
            summary.dependencies_resolved += 1;
            summary.assets_resolved += dependency.assets.len();
        }
        Ok(summary)
    }

    /// Resolves one dependency: only assets that still need work are touched.
    /// Returns the number of assets resolved (0 when everything was up to date).
    pub fn resolve(&self, dependency: &Dependency) -> Result<usize> {
        match self.pending_assets(dependency)? {
            Some(todo) => {
                self.resolve_assets(&todo)?;
                Ok(todo.assets.len())
            }
            None => Ok(0),
        }
    }

    /// The dependency restricted to assets whose marker is missing or stale,
    /// or `None` when every asset is already resolved.
    fn pending_assets(&self, dependency: &Dependency) -> Result<Option<Dependency>> {
        dependency.validate()?;
        let mut assets = Vec::new();
        for asset in &dependency.assets {
            if self.should_resolve(dependency, asset)? {
                assets.push(asset.clone());
            }
        }
        if assets.is_empty() {
            return Ok(None);
        }
        Ok(Some(Dependency {
            repo: dependency.repo.clone(),
            tag: dependency.tag.clone(),
            assets,
        }))
    }

    fn resolve_assets(&self, dependency: &Dependency) -> Result<()> {
        for asset in &dependency.assets {
            stage(format!("Downloading {}", dependency.repo), || {
                self.download(dependency, asset)
            })?;
            stage(format!("Unzipping {}", dependency.repo), || {
                self.unzip(dependency, asset)
            })?;
            self.mark_as_resolved(dependency, asset)?;
        }
        Ok(())
    }

    /// `false` only when the marker exists, is UTF-8 and equals the asset checksum.
    pub fn should_resolve(&self, dependency: &Dependency, asset: &Asset) -> Result<bool> {
        let marker = self.paths.marker_file(dependency, asset)?;
        let Ok(bytes) = fs::read(&marker) else {
            return Ok(true);
        };
        let Ok(hash) = String::from_utf8(bytes) else {
            return Ok(true);
        };
        if hash == asset.checksum {
            tracing::info!("[Resolve] {}. Skipped", marker.display());
            return Ok(false);
        }
        Ok(true)
    }

    /// Ensures the verified archive is in the download cache.
    pub fn download(&self, dependency: &Dependency, asset: &Asset) -> Result<()> {
        let download_dir = self.paths.download_directory(dependency, asset);
        let download_file = self.paths.download_file(dependency, asset);
        fs_ops::create_dir_if_needed(&download_dir)?;

        if self.is_file_downloaded(dependency, asset)? {
            return Ok(());
        }

        self.downloader.download_release_asset(
            &dependency.repo,
            &dependency.tag,
            asset.pattern.as_deref(),
            &download_file,
        )?;

        let checksum = stage("Calculating checksum", || {
            self.checksum.checksum(&download_file)
        })?;
        if checksum != asset.checksum {
            return Err(ResolveError::ChecksumMismatch {
                actual: checksum,
                expected: asset.checksum.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Cache hit when the archive exists and still matches; a stale archive is deleted.
    fn is_file_downloaded(&self, dependency: &Dependency, asset: &Asset) -> Result<bool> {
        let download_file = self.paths.download_file(dependency, asset);
        if !download_file.exists() {
            return Ok(false);
        }
        tracing::info!(
            "[Download] File {} is already downloaded. Verifying checksum",
            download_file.display()
        );
        let checksum = stage("Calculating checksum", || {
            self.checksum.checksum(&download_file)
        })?;
        if checksum != asset.checksum {
            tracing::info!(
                "[Download] Checksum is incorrect. {} != {}. Redownloading",
                checksum,
                asset.checksum
            );
            fs_ops::remove_item(&download_file)?;
            return Ok(false);
        }
        tracing::info!("[Download] Checksum is correct. Skipping");
        Ok(true)
    }

    /// Extracts the cached archive and replaces the matching entries of the output directory.
    pub fn unzip(&self, dependency: &Dependency, asset: &Asset) -> Result<()> {
        if !self.should_resolve(dependency, asset)? {
            return Ok(());
        }

        let _cleanup = TempRootGuard(&self.temp_root);
        let temp_dir = self.temp_root.join(&self.run_id);
        fs_ops::create_dir_if_needed(&temp_dir)?;

        let archive = self.paths.download_file(dependency, asset);
        self.unarchiver.unarchive(&archive, &temp_dir)?;

        let contents_dir = match asset.contents.as_deref() {
            Some(contents) if !contents.is_empty() => temp_dir.join(contents),
            _ => temp_dir,
        };
        let entries = fs_ops::list_entries(&contents_dir)?;

        let output_dir = self.paths.output_directory(dependency, asset);
        fs_ops::create_dir_if_needed(&output_dir)?;

        for source in entries {
            let Some(name) = source.file_name() else {
                continue;
            };
            let destination = output_dir.join(name);
            if fs::symlink_metadata(&destination).is_ok() {
                tracing::info!("[Unzip] Removing {}", destination.display());
                fs_ops::remove_item(&destination)?;
            }

            tracing::info!(
                "[Unzip] Copying {} to {}",
                source.display(),
                destination.display()
            );
            fs_ops::copy_item(&source, &destination)?;

            tracing::debug!("[Unzip] Removing temporary file at {}", source.display());
            let _ = fs_ops::remove_item(&source);
        }

        tracing::info!(
            "[Unzip] Successfully unzipped {} to {}",
            dependency.repo,
            output_dir.display()
        );
        Ok(())
    }

    /// Records the resolution by writing the checksum into the marker file.
    pub fn mark_as_resolved(&self, dependency: &Dependency, asset: &Asset) -> Result<()> {
        let marker = self.paths.marker_file(dependency, asset)?;
        if let Some(parent) = marker.parent() {
            fs_ops::create_dir_if_needed(parent)?;
        }
        fs::write(&marker, asset.checksum.as_bytes())
            .with_context(|| format!("write {}", marker.display()))?;
        Ok(())
    }
}

/// Removes the extraction temp root when dropped, whatever the exit path.
struct TempRootGuard<'a>(&'a Path);

impl Drop for TempRootGuard<'_> {
    fn drop(&mut self) {
        if !self.0.exists() {
            return;
        }
        if let Err(e) = fs_ops::remove_item(self.0) {
            tracing::warn!("could not remove {}: {:#}", self.0.display(), e);
        }
    }
}

/// Runs `f`, logging a failure with `label` and attaching it as context.
fn stage<T, L, F>(label: L, f: F) -> Result<T>
where
    L: fmt::Display,
    F: FnOnce() -> Result<T>,
{
    f().map_err(|e| {
        tracing::error!("{} has failed: {:#}", label, e);
        e.context(label.to_string())
    })
}
