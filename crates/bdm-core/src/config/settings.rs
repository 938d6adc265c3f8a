use crate::downloader::{DownloaderKind, DEFAULT_API_URL};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Per-user tool settings loaded from `~/.config/bdm/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Downloader backend: "gh" (default) or "http".
    #[serde(default)]
    pub downloader: DownloaderKind,
    /// GitHub REST API base URL used by the http backend.
    #[serde(default = "default_api_url")]
    pub github_api_url: String,
    /// Parent of the extraction temp root; the tool only ever creates and removes
    /// `<temp_directory>/PrivateDownloads`. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_directory: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            downloader: DownloaderKind::default(),
            github_api_url: default_api_url(),
            temp_directory: None,
        }
    }
}

pub fn settings_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load settings from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ToolSettings> {
    let path = settings_path()?;
    if !path.exists() {
        let default_settings = ToolSettings::default();
        let toml = toml::to_string_pretty(&default_settings)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default settings at {}", path.display());
        return Ok(default_settings);
    }

    let data = fs::read_to_string(&path)?;
    let settings: ToolSettings = toml::from_str(&data)?;
    Ok(settings)
}
