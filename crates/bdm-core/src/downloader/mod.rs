//! Release asset downloaders.
//!
//! The resolver depends only on the `Downloader` trait. Two backends ship with
//! the tool: the GitHub CLI (`gh release download`) and a libcurl client for
//! the GitHub REST API.

mod gh;
mod http;

pub use gh::GhCliDownloader;
pub use http::{HttpReleaseDownloader, DEFAULT_API_URL};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Fetches one named asset of a release to a file.
pub trait Downloader {
    /// Places exactly one file at `output_file`: the asset of `repo`@`tag`
    /// matching `pattern`, or the release's only asset when `pattern` is `None`.
    /// No match or several matches is an error.
    fn download_release_asset(
        &self,
        repo: &str,
        tag: &str,
        pattern: Option<&str>,
        output_file: &Path,
    ) -> Result<()>;
}

/// Downloader backend: the `gh` CLI (default) or the built-in HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloaderKind {
    #[default]
    Gh,
    Http,
}

impl fmt::Display for DownloaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloaderKind::Gh => write!(f, "gh"),
            DownloaderKind::Http => write!(f, "http"),
        }
    }
}

impl FromStr for DownloaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gh" => Ok(DownloaderKind::Gh),
            "http" => Ok(DownloaderKind::Http),
            other => Err(format!("unknown downloader '{}' (expected gh or http)", other)),
        }
    }
}

/// Builds the downloader for `kind`. `api_url` is only used by the HTTP backend.
pub fn build(kind: DownloaderKind, api_url: &str) -> Result<Box<dyn Downloader>> {
    Ok(match kind {
        DownloaderKind::Gh => Box::new(GhCliDownloader::new()?),
        DownloaderKind::Http => Box::new(HttpReleaseDownloader::new(api_url).with_env_token()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("gh".parse::<DownloaderKind>().unwrap(), DownloaderKind::Gh);
        assert_eq!("HTTP".parse::<DownloaderKind>().unwrap(), DownloaderKind::Http);
        assert!("ftp".parse::<DownloaderKind>().is_err());
    }

    #[test]
    fn kind_display_roundtrips() {
        for kind in [DownloaderKind::Gh, DownloaderKind::Http] {
            assert_eq!(kind.to_string().parse::<DownloaderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn http_backend_builds_without_external_tools() {
        assert!(build(DownloaderKind::Http, DEFAULT_API_URL).is_ok());
    }
}
