//! Content fingerprints for downloaded archives.
//!
//! The resolver only sees the `ChecksumCalculator` trait; the SHA-256
//! implementation streams the file so large archives stay out of memory.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Computes a stable lowercase-hex fingerprint of a file.
pub trait ChecksumCalculator {
    fn checksum(&self, path: &Path) -> Result<String>;
}

/// SHA-256 fingerprints, as published next to release artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ChecksumCalculator;

impl ChecksumCalculator for Sha256ChecksumCalculator {
    fn checksum(&self, path: &Path) -> Result<String> {
        sha256_path(path)
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
