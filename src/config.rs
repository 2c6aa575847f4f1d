// src/config.rs

//! Bootstrap configuration
//!
//! The bootstrap document maps source names to remote repository
//! configurations. A bundled document ships inside the binary; a user
//! document from the platform config directory may overlay it. Merging is
//! whole-entry: an overlayed source replaces the base record wholesale,
//! with no field-level merging.

use crate::context::Context;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Bundled bootstrap document, the Rust analogue of package data
const BUNDLED_BOOTSTRAP: &str = include_str!("bootstrap.toml");

/// Default sub-path to registry metadata within a source repository
pub const DEFAULT_METADATA_PATH: &str = ".registry";

fn default_metadata_path() -> String {
    DEFAULT_METADATA_PATH.to_string()
}

/// Static description of one remote source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Repository identifier in `owner/name` form
    pub repo: String,
    /// Addressing key; injected from the section key when omitted
    #[serde(default)]
    pub name: String,
    /// Default refs to sync (branches, tags, or commit hashes)
    #[serde(default)]
    pub refs: Vec<String>,
    /// Sub-path to registry metadata within the repository
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,
}

impl SourceConfig {
    /// Split the repository identifier into `(owner, name)`.
    ///
    /// The identifier must contain exactly two non-empty segments.
    pub fn repo_parts(&self) -> Result<(&str, &str)> {
        let mut parts = self.repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok((owner, name))
            }
            _ => Err(Error::ConfigError(format!(
                "repo must be in 'owner/name' form, got: {}",
                self.repo
            ))),
        }
    }
}

/// A mapping of source name to source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl BootstrapConfig {
    /// Load the bootstrap configuration for this context.
    ///
    /// With an explicit `bootstrap_path` only that document is parsed; the
    /// overlay applies only if `user_config_path` was also given explicitly.
    /// Without one, the bundled document is parsed and the platform user
    /// document overlays it when present. A missing overlay is skipped
    /// silently; a missing explicit bootstrap is a `NotFoundError`.
    pub fn load(ctx: &Context) -> Result<Self> {
        let base = match &ctx.bootstrap_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::NotFoundError(format!(
                        "bootstrap file not found: {}",
                        path.display()
                    )));
                }
                Self::parse_file(path)?
            }
            None => Self::parse_str(BUNDLED_BOOTSTRAP)?,
        };

        // Explicit bootstrap paths never implicitly pick up the user overlay
        let overlay_path = match (&ctx.bootstrap_path, &ctx.user_config_path) {
            (_, Some(explicit)) => Some(explicit.clone()),
            (None, None) => Context::default_user_config_path(),
            (Some(_), None) => None,
        };

        if let Some(path) = overlay_path {
            if path.exists() {
                let overlay = Self::parse_file(&path)?;
                return Ok(Self::merge(&base, &overlay));
            }
        }

        Ok(base)
    }

    /// Parse a bootstrap document from a file
    pub fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("failed to read {}: {e}", path.display())))?;
        Self::parse_str(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Parse a bootstrap document from TOML text
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut config: BootstrapConfig = toml::from_str(text)
            .map_err(|e| Error::ConfigError(format!("malformed bootstrap document: {e}")))?;

        // Inject section keys as names where omitted, then validate
        for (key, source) in config.sources.iter_mut() {
            if source.name.is_empty() {
                source.name = key.clone();
            }
            source.repo_parts()?;
        }

        Ok(config)
    }

    /// Merge two configurations, whole-entry and right-biased: every source
    /// name present in `overlay` replaces the base record wholesale.
    pub fn merge(base: &Self, overlay: &Self) -> Self {
        let mut sources = base.sources.clone();
        for (name, source) in &overlay.sources {
            sources.insert(name.clone(), source.clone());
        }
        Self { sources }
    }

    /// Look up a source by name
    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.get(name)
    }
}
