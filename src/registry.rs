// src/registry.rs

//! Registry document model
//!
//! A registry is the cached payload for one (source, ref): optional
//! generation metadata, a map of named file entries, and domain groupings
//! (named model bundles, program descriptors with per-platform binaries).
//! One document type serves all registry flavors; consumers read the
//! sections they care about.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filename of a registry document, both upstream and in the cache
pub const REGISTRY_FILENAME: &str = "registry.toml";

/// A single named entry: a content descriptor with at least one location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "FileEntryRepr")]
pub struct FileEntry {
    /// `algo:hex` digest of the content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Remote location to fetch the content from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local path to the content (original or cached)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Accepts both the full table form and the `"<name>" = "algo:hex"`
/// shorthand older registry producers emit
#[derive(Deserialize)]
#[serde(untagged)]
enum FileEntryRepr {
    Shorthand(String),
    Full {
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
}

impl From<FileEntryRepr> for FileEntry {
    fn from(repr: FileEntryRepr) -> Self {
        match repr {
            FileEntryRepr::Shorthand(hash) => FileEntry {
                hash: Some(hash),
                url: None,
                path: None,
            },
            FileEntryRepr::Full { hash, url, path } => FileEntry { hash, url, path },
        }
    }
}

/// Platform-specific binary distribution of a program
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Binary {
    /// Release asset filename
    pub asset: String,
    /// `algo:hex` digest of the asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Executable path within the archive, overriding the program default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
}

/// A program descriptor in the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Program {
    /// Program version (matches the owning registry's release tag)
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Repository the program's release assets are published from
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Default executable path within archives, overridden per-distribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    /// Platform tag to binary distribution
    #[serde(default)]
    pub binaries: BTreeMap<String, Binary>,
}

/// A registry document for one (source, ref)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    /// Registry schema version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Generation timestamp, RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Version of the tool that produced the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_version: Option<String>,
    /// Named file entries
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileEntry>,
    /// Named bundles of file entries
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, Vec<String>>,
    /// Program descriptors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub programs: BTreeMap<String, Program>,
}

impl Registry {
    /// Parse a registry document from TOML text and validate it
    pub fn parse(text: &str) -> Result<Self> {
        let registry: Registry = toml::from_str(text)
            .map_err(|e| Error::ValidationError(format!("malformed registry document: {e}")))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Serialize the document to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ValidationError(format!("failed to serialize registry: {e}")))
    }

    /// Check document invariants. Every file entry must carry a location
    /// (`url` or `path`); hash-only shorthand entries are accepted for
    /// registries whose content is addressed relative to the source itself.
    pub fn validate(&self) -> Result<()> {
        for (name, entry) in &self.files {
            if entry.url.is_none() && entry.path.is_none() && entry.hash.is_none() {
                return Err(Error::ValidationError(format!(
                    "file entry '{name}' declares neither url nor path"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file_entry() {
        let registry = Registry::parse(
            r#"
            schema_version = "1.0"
            generated_at = "2026-01-15T12:00:00Z"

            [files."model.dat"]
            hash = "sha256:abc123"
            url = "https://example.com/model.dat"
            "#,
        )
        .unwrap();

        let entry = &registry.files["model.dat"];
        assert_eq!(entry.hash.as_deref(), Some("sha256:abc123"));
        assert_eq!(entry.url.as_deref(), Some("https://example.com/model.dat"));
        assert_eq!(registry.schema_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_parse_shorthand_file_entry() {
        let registry = Registry::parse(
            r#"
            [files]
            "defs.dfn" = "sha256:deadbeef"
            "#,
        )
        .unwrap();

        let entry = &registry.files["defs.dfn"];
        assert_eq!(entry.hash.as_deref(), Some("sha256:deadbeef"));
        assert!(entry.url.is_none());
        assert!(entry.path.is_none());
    }

    #[test]
    fn test_parse_rejects_empty_file_entry() {
        let result = Registry::parse(
            r#"
            [files."orphan.dat"]
            "#,
        );
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_parse_programs_section() {
        let registry = Registry::parse(
            r#"
            [programs.demo]
            version = "1.2.3"
            repo = "acme/demo"
            exe = "bin/demo"

            [programs.demo.binaries.linux]
            asset = "demo-linux.zip"
            hash = "sha256:abc"

            [programs.demo.binaries.win64]
            asset = "demo-win64.zip"
            exe = "demo.exe"
            "#,
        )
        .unwrap();

        let program = &registry.programs["demo"];
        assert_eq!(program.version, "1.2.3");
        assert_eq!(program.exe.as_deref(), Some("bin/demo"));
        assert_eq!(program.binaries["linux"].asset, "demo-linux.zip");
        assert_eq!(program.binaries["win64"].exe.as_deref(), Some("demo.exe"));
    }

    #[test]
    fn test_parse_models_section() {
        let registry = Registry::parse(
            r#"
            [models]
            basic = ["basic/input.dat", "basic/grid.dat"]
            "#,
        )
        .unwrap();

        assert_eq!(registry.models["basic"].len(), 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let registry = Registry::parse(
            r#"
            schema_version = "1.0"

            [files."a.dat"]
            hash = "sha256:abc"
            url = "https://example.com/a.dat"

            [programs.demo]
            version = "1.0.0"
            repo = "acme/demo"

            [programs.demo.binaries.linux]
            asset = "demo-linux.zip"
            "#,
        )
        .unwrap();

        let text = registry.to_toml().unwrap();
        let reparsed = Registry::parse(&text).unwrap();
        assert_eq!(registry, reparsed);
    }
}
