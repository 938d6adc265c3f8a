//! Typed failures raised by the resolution engine itself.
//!
//! Collaborator failures (downloader, unarchiver, filesystem) are not listed
//! here; they travel as `anyhow::Error` with a stage label attached.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Neither `pattern` nor `contents` is set, so no marker file name can be derived.
    #[error("asset {checksum} of {repo} needs a `pattern` or `contents` to name its marker file")]
    PathDerivation { repo: String, checksum: String },

    /// A manifest value that is joined onto a root would leave that root.
    #[error("{field} `{value}` of {repo} must be a relative path without `..`")]
    UnsafePath {
        repo: String,
        field: &'static str,
        value: String,
    },

    /// The archive on disk does not have the declared fingerprint.
    #[error("checksum is incorrect: {actual} != {expected}")]
    ChecksumMismatch { actual: String, expected: String },
}
