//! Archive inflation behind the `Unarchiver` trait.

use crate::fs_ops;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Fully extracts an archive into a directory, creating the directory if needed.
pub trait Unarchiver {
    fn unarchive(&self, archive: &Path, output_dir: &Path) -> Result<()>;
}

/// In-process zip extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipUnarchiver;

impl Unarchiver for ZipUnarchiver {
    fn unarchive(&self, archive: &Path, output_dir: &Path) -> Result<()> {
        tracing::info!("[Unzip] {} to {}", archive.display(), output_dir.display());
        fs::create_dir_all(output_dir)
            .with_context(|| format!("create directory {}", output_dir.display()))?;

        let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("{} is not a readable zip archive", archive.display()))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .with_context(|| format!("read entry {} of {}", i, archive.display()))?;
            // enclosed_name rejects absolute paths and `..` components.
            let Some(relative) = entry.enclosed_name() else {
                bail!("unsafe path in archive: {}", entry.name());
            };
            let target = output_dir.join(&relative);

            if entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
                let mut link = String::new();
                entry
                    .read_to_string(&mut link)
                    .with_context(|| format!("read link target of {}", entry.name()))?;
                let link = PathBuf::from(link);
                if !link_stays_inside(&relative, &link) {
                    bail!(
                        "symlink {} -> {} points outside the archive",
                        relative.display(),
                        link.display()
                    );
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("create directory {}", parent.display()))?;
                }
                fs_ops::symlink(&link, &target)?;
                continue;
            }

            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("create directory {}", target.display()))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {}", parent.display()))?;
            }
            let mut out =
                File::create(&target).with_context(|| format!("create {}", target.display()))?;
            std::io::copy(&mut entry, &mut out)
                .with_context(|| format!("extract {}", target.display()))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
                }
            }
        }
        Ok(())
    }
}

/// Whether `link`, stored at archive path `entry`, resolves to a location
/// inside the extraction root. Absolute targets never do.
fn link_stays_inside(entry: &Path, link: &Path) -> bool {
    let mut depth = entry
        .parent()
        .map(|p| p.components().filter(|c| matches!(c, Component::Normal(_))).count())
        .unwrap_or(0);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
