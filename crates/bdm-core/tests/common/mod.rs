//! Shared fixtures for resolver integration tests: real zip archives and a
//! downloader that serves them from disk.

#![allow(dead_code)]

use anyhow::{bail, Result};
use bdm_core::downloader::Downloader;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

/// Writes a zip at `path` with the given `(name, body)` file entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap();
}

/// Serves release assets by copying prepared files, keyed by `repo@tag`.
#[derive(Clone, Default)]
pub struct FixtureDownloader {
    assets: HashMap<String, PathBuf>,
    pub calls: Arc<AtomicUsize>,
}

impl FixtureDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, repo: &str, tag: &str, archive: impl Into<PathBuf>) -> Self {
        self.assets.insert(format!("{}@{}", repo, tag), archive.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for FixtureDownloader {
    fn download_release_asset(
        &self,
        repo: &str,
        tag: &str,
        _pattern: Option<&str>,
        output_file: &Path,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(source) = self.assets.get(&format!("{}@{}", repo, tag)) else {
            bail!("release {} {} not found", repo, tag);
        };
        fs::copy(source, output_file)?;
        Ok(())
    }
}
