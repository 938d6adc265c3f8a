//! Manifest entries: a pinned release (`Dependency`) and the artifacts to fetch from it (`Asset`).

use crate::resolver::ResolveError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// A pinned `{repo, tag}` release reference with one or more assets to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDependency")]
pub struct Dependency {
    /// Repository in `owner/name` form.
    pub repo: String,
    /// Release tag, e.g. `1.0.0`.
    pub tag: String,
    /// Assets to resolve, in manifest order. Never empty.
    pub assets: Vec<Asset>,
}

/// One artifact of a dependency's release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Lowercase hex SHA-256 of the release artifact.
    pub checksum: String,
    /// Selects the artifact when the release has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Subdirectory inside the archive whose children are copied to the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    /// Extra path segment under the repo's output directory.
    #[serde(
        rename = "output",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_directory: Option<String>,
}

impl Asset {
    pub fn new(checksum: impl Into<String>) -> Self {
        Self {
            checksum: checksum.into(),
            pattern: None,
            contents: None,
            output_directory: None,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn with_output_directory(mut self, output_directory: impl Into<String>) -> Self {
        self.output_directory = Some(output_directory.into());
        self
    }
}

impl Dependency {
    pub fn new(repo: impl Into<String>, tag: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.into(),
            assets,
        }
    }

    /// Checks every value that becomes a path segment under the output, cache
    /// or temp roots: `repo`, `tag`, and each asset's `contents` and `output`.
    pub fn validate(&self) -> Result<(), ResolveError> {
        self.check_segment("repo", &self.repo)?;
        self.check_segment("tag", &self.tag)?;
        for asset in &self.assets {
            if let Some(contents) = &asset.contents {
                self.check_segment("contents", contents)?;
            }
            if let Some(output) = &asset.output_directory {
                self.check_segment("output", output)?;
            }
        }
        Ok(())
    }

    fn check_segment(&self, field: &'static str, value: &str) -> Result<(), ResolveError> {
        let escapes = Path::new(value).components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(ResolveError::UnsafePath {
                repo: self.repo.clone(),
                field,
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

/// Wire form of a dependency: either an `assets` list, or the legacy inline
/// single-asset fields next to `repo`/`tag`.
#[derive(Deserialize)]
struct RawDependency {
    repo: String,
    tag: String,
    #[serde(default)]
    assets: Option<Vec<Asset>>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    contents: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

impl TryFrom<RawDependency> for Dependency {
    type Error = String;

    fn try_from(raw: RawDependency) -> Result<Self, Self::Error> {
        let assets = match (raw.assets, raw.checksum) {
            (Some(assets), _) => assets,
            (None, Some(checksum)) => vec![Asset {
                checksum,
                pattern: raw.pattern,
                contents: raw.contents,
                output_directory: raw.output,
            }],
            (None, None) => {
                return Err(format!(
                    "dependency {} ({}) has neither `assets` nor `checksum`",
                    raw.repo, raw.tag
                ))
            }
        };
        if assets.is_empty() {
            return Err(format!(
                "dependency {} ({}) has an empty `assets` list",
                raw.repo, raw.tag
            ));
        }
        let dependency = Dependency {
            repo: raw.repo,
            tag: raw.tag,
            assets,
        };
        dependency.validate().map_err(|e| e.to_string())?;
        Ok(dependency)
    }
}
