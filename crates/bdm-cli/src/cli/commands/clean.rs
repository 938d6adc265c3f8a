//! Clean command: remove the output and cache directories.

use super::{directories, tool_version};
use crate::cli::LocationArgs;
use anyhow::Result;
use bdm_core::config::ConfigurationReader;
use bdm_core::fs_ops;
use std::path::Path;

/// Directories come from the manifest when it can be read; otherwise defaults apply.
pub fn run_clean(locations: &LocationArgs) -> Result<()> {
    let reader = ConfigurationReader::from_current_dir()?;
    let manifest = match reader.read_manifest(locations.config_path(), &tool_version()?) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!("[Clean] Using default directories: {:#}", e);
            None
        }
    };
    let (output_dir, cache_dir) = directories(&reader, locations, manifest.as_ref());

    remove_logged(&output_dir);
    remove_logged(&cache_dir);
    Ok(())
}

fn remove_logged(path: &Path) {
    if std::fs::symlink_metadata(path).is_err() {
        return;
    }
    tracing::info!("[Clean] Removing {}", path.display());
    if let Err(e) = fs_ops::remove_item(path) {
        tracing::warn!("[Clean] Could not remove {}: {:#}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_logged_deletes_tree_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("out/a/b");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("f"), b"x").unwrap();

        remove_logged(&dir.path().join("out"));
        assert!(!dir.path().join("out").exists());

        remove_logged(&dir.path().join("missing"));
    }
}
