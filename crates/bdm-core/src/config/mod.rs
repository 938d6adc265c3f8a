//! Configuration: the dependency manifest (YAML/JSON, per project) and the
//! tool settings (TOML, per user).

mod manifest;
mod reader;
mod settings;

pub use manifest::{Manifest, ManifestFormat};
pub use reader::{check_minimum_version, ConfigurationReader};
pub use settings::{load_or_init, settings_path, ToolSettings};
