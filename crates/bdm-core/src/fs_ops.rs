//! Filesystem helpers that treat files and directory subtrees alike.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Creates `dir` and its parents unless it already exists.
pub fn create_dir_if_needed(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Removes a file, symlink or whole directory subtree.
pub fn remove_item(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("remove directory {}", path.display()))?;
    } else {
        fs::remove_file(path).with_context(|| format!("remove file {}", path.display()))?;
    }
    Ok(())
}

/// Copies a file, symlink or directory subtree to `dest`. `dest` must not exist yet.
/// Symlinks are recreated as links, never followed.
pub fn copy_item(src: &Path, dest: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).with_context(|| format!("stat {}", src.display()))?;
    if !meta.is_dir() {
        return copy_entry(src, dest, meta.file_type());
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("walk {}", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("create directory {}", target.display()))?;
        } else {
            copy_entry(entry.path(), &target, entry.file_type())?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dest: &Path, file_type: fs::FileType) -> Result<()> {
    if file_type.is_symlink() {
        let link = fs::read_link(src).with_context(|| format!("read link {}", src.display()))?;
        return symlink(&link, dest);
    }
    fs::copy(src, dest).with_context(|| format!("copy {} to {}", src.display(), dest.display()))?;
    Ok(())
}

/// Creates `link` pointing at `target`.
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("link {} -> {}", link.display(), target.display()))
}

#[cfg(not(unix))]
pub fn symlink(target: &Path, link: &Path) -> Result<()> {
    anyhow::bail!(
        "cannot create symlink {} -> {} on this platform",
        link.display(),
        target.display()
    )
}

/// Immediate entries of `dir`, sorted by name.
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("list {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}
