// src/discovery.rs

//! Registry discovery
//!
//! Resolves a (source, ref) pair to a concrete registry document by probing
//! two candidate locations in a fixed order:
//!
//! 1. A release asset attached to a tagged release
//! 2. A version-controlled file fetched from the repository at the ref
//!
//! A tagged release is authoritative when present, so the order is fixed
//! and not configurable per call. Only a clean 404 on the first tier falls
//! through; any other failure surfaces immediately rather than masking a
//! real problem behind the fallback.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::net::HttpClient;
use crate::registry::{Registry, REGISTRY_FILENAME};
use tracing::{debug, info};

/// Which discovery tier produced the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Fetched as an asset of a tagged release
    ReleaseAsset,
    /// Fetched as a version-controlled file at the ref
    VersionControlled,
}

impl DiscoveryMode {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReleaseAsset => "release asset",
            Self::VersionControlled => "version-controlled",
        }
    }
}

/// Result of a successful discovery
#[derive(Debug, Clone)]
pub struct Discovered {
    pub mode: DiscoveryMode,
    /// URL the registry was fetched from
    pub url: String,
    pub registry: Registry,
}

/// Release-asset URL for a (source, ref) pair
pub fn release_asset_url(source: &SourceConfig, reference: &str) -> String {
    format!(
        "https://github.com/{}/releases/download/{}/{}",
        source.repo, reference, REGISTRY_FILENAME
    )
}

/// Version-controlled raw-content URL for a (source, ref) pair
pub fn version_controlled_url(source: &SourceConfig, reference: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        source.repo, reference, source.metadata_path, REGISTRY_FILENAME
    )
}

/// Discover the registry for a (source, ref) pair.
///
/// HTTP 404 on the release-asset URL is the expected "no release for this
/// ref" case and falls through to the version-controlled URL. A 404 there
/// too means the registry genuinely does not exist (`NotFoundError`); any
/// other failure on either tier is a `DiscoveryError`.
pub fn discover(client: &HttpClient, source: &SourceConfig, reference: &str) -> Result<Discovered> {
    source.repo_parts()?;

    let release_url = release_asset_url(source, reference);
    debug!("probing release asset: {}", release_url);

    match client.fetch_text(&release_url) {
        Ok(text) => {
            let registry = parse_registry(&text, source, reference)?;
            info!(
                "discovered registry for {}@{} via release asset",
                source.name, reference
            );
            return Ok(Discovered {
                mode: DiscoveryMode::ReleaseAsset,
                url: release_url,
                registry,
            });
        }
        Err(Error::HttpStatus { status: 404, .. }) => {
            debug!("no release asset for {}@{}", source.name, reference);
        }
        Err(e) => {
            return Err(Error::DiscoveryError(format!(
                "error fetching registry from release assets for '{}@{}': {e}",
                source.name, reference
            )));
        }
    }

    let vc_url = version_controlled_url(source, reference);
    debug!("probing version-controlled registry: {}", vc_url);

    match client.fetch_text(&vc_url) {
        Ok(text) => {
            let registry = parse_registry(&text, source, reference)?;
            info!(
                "discovered registry for {}@{} via version-controlled file",
                source.name, reference
            );
            Ok(Discovered {
                mode: DiscoveryMode::VersionControlled,
                url: vc_url,
                registry,
            })
        }
        Err(Error::HttpStatus { status: 404, .. }) => Err(Error::NotFoundError(format!(
            "no registry found for '{}@{}' via release asset or {}",
            source.name, reference, source.metadata_path
        ))),
        Err(e) => Err(Error::DiscoveryError(format!(
            "error fetching registry from repository for '{}@{}': {e}",
            source.name, reference
        ))),
    }
}

/// Parse fetched registry text; malformed upstream data is a discovery
/// failure, not silently ignored
fn parse_registry(text: &str, source: &SourceConfig, reference: &str) -> Result<Registry> {
    Registry::parse(text).map_err(|e| {
        Error::DiscoveryError(format!(
            "malformed registry for '{}@{}': {e}",
            source.name, reference
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(repo: &str, metadata_path: &str) -> SourceConfig {
        SourceConfig {
            repo: repo.to_string(),
            name: "demo".to_string(),
            refs: vec![],
            metadata_path: metadata_path.to_string(),
        }
    }

    #[test]
    fn test_release_asset_url() {
        let source = source("acme/demo", ".registry");
        assert_eq!(
            release_asset_url(&source, "v1.0.0"),
            "https://github.com/acme/demo/releases/download/v1.0.0/registry.toml"
        );
    }

    #[test]
    fn test_version_controlled_url() {
        let source = source("acme/demo", ".registry");
        assert_eq!(
            version_controlled_url(&source, "develop"),
            "https://raw.githubusercontent.com/acme/demo/develop/.registry/registry.toml"
        );
    }

    #[test]
    fn test_version_controlled_url_custom_path() {
        let source = source("acme/demo", "meta/registries");
        assert_eq!(
            version_controlled_url(&source, "v2"),
            "https://raw.githubusercontent.com/acme/demo/v2/meta/registries/registry.toml"
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(DiscoveryMode::ReleaseAsset.name(), "release asset");
        assert_eq!(DiscoveryMode::VersionControlled.name(), "version-controlled");
    }
}
