//! Manifest model and decoding.
//!
//! Two document shapes are accepted: the canonical object with a
//! `dependencies` list (plus optional `minimumVersion`, `outputDirectory`,
//! `cacheDirectory`), and the legacy bare list of dependencies.

use crate::model::Dependency;
use anyhow::Result;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Oldest tool version able to process this manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<Version>,
    /// Where resolved dependencies are placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    /// Where downloaded archives are cached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<String>,
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn from_dependencies(dependencies: Vec<Dependency>) -> Self {
        Self {
            minimum_version: None,
            output_directory: None,
            cache_directory: None,
            dependencies,
        }
    }

    /// Decodes the canonical schema, falling back to the legacy list. When both
    /// fail the canonical error is returned.
    pub fn parse(data: &str, format: ManifestFormat) -> Result<Self> {
        match format {
            ManifestFormat::Json => decode_with_fallback(
                serde_json::from_str::<Manifest>(data),
                || serde_json::from_str::<Vec<Dependency>>(data),
            ),
            ManifestFormat::Yaml => decode_with_fallback(
                serde_yaml_ng::from_str::<Manifest>(data),
                || serde_yaml_ng::from_str::<Vec<Dependency>>(data),
            ),
        }
    }
}

/// Manifest encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// `.yaml`/`.yml` are YAML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ManifestFormat::Yaml
            }
            _ => ManifestFormat::Json,
        }
    }
}

fn decode_with_fallback<E, F>(canonical: Result<Manifest, E>, legacy: F) -> Result<Manifest>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce() -> Result<Vec<Dependency>, E>,
{
    match canonical {
        Ok(manifest) => Ok(manifest),
        Err(canonical_err) => match legacy() {
            Ok(dependencies) => Ok(Manifest::from_dependencies(dependencies)),
            Err(_) => Err(canonical_err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Asset;

    #[test]
    fn json_legacy_list() {
        let json = r#"
            [
                {"repo": "A", "tag": "0.0.1", "pattern": "pattern1", "checksum": "check1"},
                {"repo": "B", "tag": "0.0.2", "contents": "contents2",
                 "output": "output/directory2", "checksum": "check2"}
            ]
        "#;
        let manifest = Manifest::parse(json, ManifestFormat::Json).unwrap();
        assert_eq!(
            manifest,
            Manifest::from_dependencies(vec![
                Dependency::new("A", "0.0.1", vec![Asset::new("check1").with_pattern("pattern1")]),
                Dependency::new(
                    "B",
                    "0.0.2",
                    vec![Asset::new("check2")
                        .with_contents("contents2")
                        .with_output_directory("output/directory2")]
                ),
            ])
        );
    }

    #[test]
    fn yaml_full_schema_mixing_inline_and_assets() {
        let yaml = r#"
minimumVersion: 0.0.1
outputDirectory: output/directory
cacheDirectory: cache/directory
dependencies:
  - repo: A
    tag: "0.0.1"
    pattern: pattern1
    checksum: "check1"
  - repo: B
    tag: 0.0.2
    assets:
      - contents: contents2
        output: output/directory2
        checksum: check2
"#;
        let manifest = Manifest::parse(yaml, ManifestFormat::Yaml).unwrap();
        assert_eq!(manifest.minimum_version, Some(Version::new(0, 0, 1)));
        assert_eq!(manifest.output_directory.as_deref(), Some("output/directory"));
        assert_eq!(manifest.cache_directory.as_deref(), Some("cache/directory"));
        assert_eq!(manifest.dependencies.len(), 2);
        assert_eq!(manifest.dependencies[1].tag, "0.0.2");
        assert_eq!(
            manifest.dependencies[1].assets,
            vec![Asset::new("check2")
                .with_contents("contents2")
                .with_output_directory("output/directory2")]
        );
    }

    #[test]
    fn unquoted_yaml_tags_keep_their_text() {
        let yaml = r#"
- repo: org/one
  tag: 1.0
  checksum: c1
  pattern: a.zip
- repo: org/two
  tag: 1.10
  checksum: c2
  pattern: b.zip
- repo: org/three
  tag: 2
  checksum: c3
  pattern: c.zip
"#;
        let manifest = Manifest::parse(yaml, ManifestFormat::Yaml).unwrap();
        let tags: Vec<_> = manifest.dependencies.iter().map(|d| d.tag.as_str()).collect();
        assert_eq!(tags, vec!["1.0", "1.10", "2"]);
    }

    #[test]
    fn canonical_error_surfaces_when_both_schemas_fail() {
        let json = r#"{"dependencies": [{"repo": "A", "tag": "1"}]}"#;
        let err = Manifest::parse(json, ManifestFormat::Json).unwrap_err();
        assert!(err.to_string().contains("neither `assets` nor `checksum`"), "{}", err);
    }

    #[test]
    fn invalid_minimum_version_is_error() {
        let yaml = "minimumVersion: not-a-version\ndependencies: []\n";
        assert!(Manifest::parse(yaml, ManifestFormat::Yaml).is_err());
    }

    #[test]
    fn format_from_extension() {
        let format = |name: &str| ManifestFormat::from_path(Path::new(name));
        assert_eq!(format(".binary-dependencies.yaml"), ManifestFormat::Yaml);
        assert_eq!(format("deps.YML"), ManifestFormat::Yaml);
        assert_eq!(format("Dependencies.json"), ManifestFormat::Json);
        assert_eq!(format("deps"), ManifestFormat::Json);
    }
}
