//! Image name lookup.
//!
//! Maps logical image roles to concrete registry tags. The mapping lives in a
//! small TOML or JSON file in the repository:
//!
//! ```toml
//! ImageBuilderLinux = "mcr.microsoft.com/dotnet-buildtools/image-builder:linux-amd64"
//! ImageBuilderWindows = "mcr.microsoft.com/dotnet-buildtools/image-builder:nanoserver"
//! ```

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Logical image roles the orchestrator needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    /// Runner base image for Linux hosts
    ImageBuilderLinux,
    /// Runner image carrying the Windows payload
    ImageBuilderWindows,
}

impl ImageRole {
    /// Key used in the image names file
    pub fn key(self) -> &'static str {
        match self {
            ImageRole::ImageBuilderLinux => "ImageBuilderLinux",
            ImageRole::ImageBuilderWindows => "ImageBuilderWindows",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Role to tag mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ImageNames(HashMap<String, String>);

impl ImageNames {
    /// Build a mapping from (role, tag) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ImageRole, S)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(role, tag)| (role.key().to_string(), tag.into()))
                .collect(),
        )
    }

    /// Tag for `role`, or an error naming the missing role
    pub fn get(&self, role: ImageRole) -> Result<&str> {
        self.0
            .get(role.key())
            .map(String::as_str)
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingImage {
                    role: role.key().to_string(),
                }
                .into()
            })
    }

    /// Parse a mapping; `.json` files are read as JSON, everything else as TOML.
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        } else {
            toml::from_str(contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            }
            .into()
        })
    }
}

/// Source of image names
pub trait ImageNameProvider {
    /// Resolve the current role to tag mapping
    fn image_names(&self) -> Result<ImageNames>;
}

/// Reads image names from a file each time they are requested
#[derive(Debug, Clone)]
pub struct FileImageNames {
    path: PathBuf,
}

impl FileImageNames {
    /// Provider backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageNameProvider for FileImageNames {
    fn image_names(&self) -> Result<ImageNames> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        ImageNames::parse(&self.path, &contents)
    }
}

/// Fixed in-memory image names
#[derive(Debug, Clone, Default)]
pub struct StaticImageNames(pub ImageNames);

impl ImageNameProvider for StaticImageNames {
    fn image_names(&self) -> Result<ImageNames> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_mapping() {
        let names = ImageNames::parse(
            Path::new("eng/image-names.toml"),
            "ImageBuilderLinux = \"registry/ib:linux\"\n\
             ImageBuilderWindows = \"registry/ib:win\"\n",
        )
        .expect("valid toml");
        assert_eq!(
            names.get(ImageRole::ImageBuilderLinux).ok(),
            Some("registry/ib:linux")
        );
        assert_eq!(
            names.get(ImageRole::ImageBuilderWindows).ok(),
            Some("registry/ib:win")
        );
    }

    #[test]
    fn test_parse_json_mapping() {
        let names = ImageNames::parse(
            Path::new("image-names.JSON"),
            r#"{ "ImageBuilderLinux": "registry/ib:linux" }"#,
        )
        .expect("valid json");
        assert_eq!(
            names.get(ImageRole::ImageBuilderLinux).ok(),
            Some("registry/ib:linux")
        );
    }

    #[test]
    fn test_missing_role_names_the_role() {
        let names = ImageNames::from_pairs([(ImageRole::ImageBuilderLinux, "registry/ib:linux")]);
        let err = names.get(ImageRole::ImageBuilderWindows).unwrap_err();
        assert!(err.to_string().contains("ImageBuilderWindows"));
    }

    #[test]
    fn test_blank_tag_counts_as_missing() {
        let names = ImageNames::from_pairs([(ImageRole::ImageBuilderLinux, "  ")]);
        assert!(names.get(ImageRole::ImageBuilderLinux).is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let err = ImageNames::parse(Path::new("names.toml"), "ImageBuilderLinux = ").unwrap_err();
        assert!(err.to_string().contains("names.toml"));
    }

    #[test]
    fn test_file_provider_reads_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("image-names.toml");
        std::fs::write(&path, "ImageBuilderWindows = \"registry/ib:win\"\n").expect("write");

        let names = FileImageNames::new(&path).image_names().expect("readable");
        assert_eq!(
            names.get(ImageRole::ImageBuilderWindows).ok(),
            Some("registry/ib:win")
        );
    }
}
