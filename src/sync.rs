// src/sync.rs

//! Registry synchronization
//!
//! Drives discovery and the cache across one or many (source, ref) pairs,
//! producing an aggregated result. Every attempted pair lands in exactly
//! one bucket of the result: synced, skipped, or failed. A failure on one
//! pair never aborts the remaining pairs.

use crate::cache::Cache;
use crate::config::BootstrapConfig;
use crate::context::Context;
use crate::discovery;
use crate::error::{Error, Result};
use crate::net::HttpClient;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Restrict to one source; `None` syncs all configured sources
    pub source: Option<String>,
    /// Restrict to one ref; `None` syncs all configured refs
    pub reference: Option<String>,
    /// Re-fetch even when an entry is already cached
    pub force: bool,
}

/// Aggregated result of a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// (source, ref) pairs fetched and cached in this run
    pub synced: Vec<(String, String)>,
    /// (source, ref, reason) pairs left untouched
    pub skipped: Vec<(String, String, String)>,
    /// (source, ref, error) pairs that could not be synced
    pub failed: Vec<(String, String, String)>,
}

impl SyncResult {
    pub fn is_empty(&self) -> bool {
        self.synced.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Sync status of one configured source
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub repo: String,
    pub configured_refs: Vec<String>,
    pub cached_refs: Vec<String>,
    pub missing_refs: Vec<String>,
}

/// Synchronize registries into the local cache.
///
/// The target set is one specific pair when both `source` and `reference`
/// are given, all configured refs of one source when only `source` is
/// given, and the full cross-product of configured sources and refs when
/// neither is. Already-cached pairs are skipped unless `force`. A source
/// with no configured refs contributes nothing to the target set.
pub fn sync(ctx: &Context, opts: &SyncOptions) -> Result<SyncResult> {
    let config = BootstrapConfig::load(ctx)?;
    let cache = Cache::new(&ctx.cache_root);
    let client = HttpClient::new(ctx.token.clone())?;

    let sources: Vec<&crate::config::SourceConfig> = match &opts.source {
        Some(name) => {
            let source = config.get(name).ok_or_else(|| {
                Error::NotFoundError(format!("source '{name}' not found in bootstrap"))
            })?;
            vec![source]
        }
        None => config.sources.values().collect(),
    };

    let mut result = SyncResult::default();

    for source in sources {
        let refs: Vec<String> = match &opts.reference {
            Some(reference) => vec![reference.clone()],
            None => source.refs.clone(),
        };

        if refs.is_empty() {
            debug!("no refs configured for source '{}', skipping", source.name);
            continue;
        }

        for reference in refs {
            if !opts.force && cache.has(&source.name, &reference) {
                debug!("{}@{} already cached", source.name, reference);
                result.skipped.push((
                    source.name.clone(),
                    reference.clone(),
                    "already cached".to_string(),
                ));
                continue;
            }

            info!("discovering registry {}@{}", source.name, reference);
            match discovery::discover(&client, source, &reference)
                .and_then(|d| cache.save(&d.registry, &source.name, &reference))
            {
                Ok(_) => {
                    info!("synced {}@{}", source.name, reference);
                    result.synced.push((source.name.clone(), reference));
                }
                Err(e) => {
                    warn!("failed to sync {}@{}: {}", source.name, reference, e);
                    result
                        .failed
                        .push((source.name.clone(), reference, e.to_string()));
                }
            }
        }
    }

    Ok(result)
}

/// Best-effort sync warm-up: identical algorithm, but every error is
/// swallowed and the call becomes a no-op on failure. Used only for
/// optional convenience paths, never for explicit user-invoked sync.
pub fn try_sync_best_effort(ctx: &Context) {
    if !ctx.take_sync_attempt() {
        return;
    }

    debug!("attempting best-effort registry sync");
    if let Err(e) = sync(ctx, &SyncOptions::default()) {
        debug!("best-effort sync failed: {}", e);
    }
}

/// Report sync status for every configured source
pub fn sync_status(ctx: &Context) -> Result<BTreeMap<String, SyncStatus>> {
    let config = BootstrapConfig::load(ctx)?;
    let cache = Cache::new(&ctx.cache_root);
    let cached: std::collections::BTreeSet<(String, String)> =
        cache.list().into_iter().collect();

    let mut status = BTreeMap::new();
    for source in config.sources.values() {
        let mut cached_refs = Vec::new();
        let mut missing_refs = Vec::new();

        for reference in &source.refs {
            if cached.contains(&(source.name.clone(), reference.clone())) {
                cached_refs.push(reference.clone());
            } else {
                missing_refs.push(reference.clone());
            }
        }

        status.insert(
            source.name.clone(),
            SyncStatus {
                repo: source.repo.clone(),
                configured_refs: source.refs.clone(),
                cached_refs,
                missing_refs,
            },
        );
    }

    Ok(status)
}
