// src/install/mod.rs

//! Program installation
//!
//! For the program flavor of registry: locates a program in the cached
//! registries, downloads and verifies its platform-specific release asset,
//! resolves the in-archive executable path, extracts into the binaries
//! cache, copies the executable into a chosen install directory, and
//! records the installation in the program's ledger.

mod bindir;
mod exe;
mod extract;
mod ledger;
mod platform;

pub use bindir::{candidates, resolve_bindir, select_bindir, BindirCandidate};
pub use exe::{detect_exe_path, get_exe_path, with_platform_suffix};
pub use extract::{archive_stem, extract_archive, list_archive, mark_executable};
pub use ledger::{Installation, Ledger, SourceInfo};
pub use platform::Platform;

use crate::cache::Cache;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hash;
use crate::net::HttpClient;
use crate::registry::{Binary, Program};
use crate::sync::{self, SyncOptions};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for an install run
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub program: String,
    /// Exact version (release tag); `latest` resolves through the releases
    /// API; `None` picks the newest cached version
    pub version: Option<String>,
    /// Explicit install directory; `None` auto-selects the first writable
    /// candidate
    pub bindir: Option<PathBuf>,
    /// Explicit platform tag; `None` detects the host platform
    pub platform: Option<Platform>,
    /// Re-download and re-extract even when caches are populated
    pub force: bool,
}

/// Options for an uninstall run
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    pub program: String,
    pub version: Option<String>,
    /// Restrict removal to one install directory
    pub bindir: Option<PathBuf>,
    /// Remove every installed version
    pub all_versions: bool,
    /// Additionally purge the archive and extraction caches
    pub remove_cache: bool,
}

/// A program entry located in a cached registry
#[derive(Debug, Clone)]
struct LocatedProgram {
    source: String,
    reference: String,
    program: Program,
}

/// Install a program, returning the paths of the installed executables
pub fn install(ctx: &Context, opts: &InstallOptions) -> Result<Vec<PathBuf>> {
    let cache = Cache::new(&ctx.cache_root);
    let client = HttpClient::new(ctx.token.clone())?;

    // Nothing cached yet: a sync is required before anything can be found
    if cache.list().is_empty() {
        info!("no cached registries, syncing before install");
        sync::sync(ctx, &SyncOptions::default())?;
    }

    let located = locate_program(&cache, &client, &opts.program, opts.version.as_deref())?;
    let program = &located.program;
    let version = &located.reference;

    let platform = match opts.platform {
        Some(platform) => platform,
        None => Platform::detect()?,
    };

    let dist = program.binaries.get(platform.tag()).ok_or_else(|| {
        let available: Vec<&str> = program.binaries.keys().map(String::as_str).collect();
        Error::InstallationError(format!(
            "no {} distribution of '{}' (available platforms: {})",
            platform,
            opts.program,
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        ))
    })?;

    let bindir = match &opts.bindir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| Error::IoError(format!("failed to create {}: {e}", dir.display())))?;
            dir.clone()
        }
        None => resolve_bindir(ctx, &opts.program)?,
    };

    info!(
        "installing {}@{} ({}) into {}",
        opts.program,
        version,
        platform,
        bindir.display()
    );

    let asset_url = format!(
        "https://github.com/{}/releases/download/{}/{}",
        program.repo, version, dist.asset
    );
    let archive_path = download_asset(
        ctx,
        &client,
        &opts.program,
        version,
        platform,
        dist,
        &asset_url,
        opts.force,
    )?;

    let exe_rel = resolve_exe_path(&opts.program, program, dist, platform, &archive_path)?;

    let extract_dir = ctx
        .cache_root
        .join("binaries")
        .join(&opts.program)
        .join(version)
        .join(platform.tag());
    if opts.force && extract_dir.exists() {
        fs::remove_dir_all(&extract_dir)
            .map_err(|e| Error::IoError(format!("failed to clear extraction cache: {e}")))?;
    }
    if !extract_dir.join(&exe_rel).exists() {
        extract_archive(&archive_path, &extract_dir)?;
    } else {
        debug!("reusing extracted binaries at {}", extract_dir.display());
    }

    let extracted_exe = extract_dir.join(&exe_rel);
    if !extracted_exe.exists() {
        return Err(Error::InstallationError(format!(
            "executable '{exe_rel}' not found in {} after extraction",
            dist.asset
        )));
    }

    let exe_name = Path::new(&exe_rel)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InstallationError(format!("invalid executable path: {exe_rel}")))?;
    let installed = bindir.join(&exe_name);

    fs::copy(&extracted_exe, &installed).map_err(|e| {
        Error::IoError(format!(
            "failed to install {} to {}: {e}",
            extracted_exe.display(),
            installed.display()
        ))
    })?;
    mark_executable(&installed)?;

    let ledger = Ledger::new(&ctx.cache_root);
    ledger.add(
        &opts.program,
        Installation {
            version: version.clone(),
            platform: platform.tag().to_string(),
            bindir: bindir.clone(),
            installed_at: Utc::now(),
            source: SourceInfo {
                repo: program.repo.clone(),
                reference: located.reference.clone(),
                asset_url,
                hash: dist.hash.clone(),
            },
            executables: vec![exe_name],
        },
    )?;

    info!(
        "installed {}@{} from {} to {}",
        opts.program,
        version,
        located.source,
        installed.display()
    );
    Ok(vec![installed])
}

/// Uninstall a program: removes matching executables from their bindirs and
/// matching entries from the ledger. A non-existent installation is a
/// silent no-op.
pub fn uninstall(ctx: &Context, opts: &UninstallOptions) -> Result<Vec<Installation>> {
    if opts.version.is_none() && !opts.all_versions {
        return Err(Error::InstallationError(
            "a version is required unless all versions are requested".to_string(),
        ));
    }

    let ledger = Ledger::new(&ctx.cache_root);
    let version = if opts.all_versions {
        None
    } else {
        opts.version.as_deref()
    };
    let removed = ledger.remove(&opts.program, version, opts.bindir.as_deref())?;

    for entry in &removed {
        for exe in &entry.executables {
            let path = entry.bindir.join(exe);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    Error::IoError(format!("failed to remove {}: {e}", path.display()))
                })?;
                info!("removed {}", path.display());
            }
        }
    }

    if opts.remove_cache {
        for kind in ["archives", "binaries"] {
            let dir = ctx.cache_root.join(kind).join(&opts.program);
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| {
                    Error::IoError(format!("failed to remove {}: {e}", dir.display()))
                })?;
            }
        }
    }

    Ok(removed)
}

/// List installation history, optionally restricted to one program
pub fn list_installed(
    ctx: &Context,
    program: Option<&str>,
) -> Result<BTreeMap<String, Vec<Installation>>> {
    let ledger = Ledger::new(&ctx.cache_root);
    let programs = match program {
        Some(name) => vec![name.to_string()],
        None => ledger.programs(),
    };

    let mut installed = BTreeMap::new();
    for name in programs {
        let entries = ledger.load(&name)?;
        if !entries.is_empty() {
            installed.insert(name, entries);
        }
    }
    Ok(installed)
}

/// Search cached registries for a program entry.
///
/// With a version, the owning registry's ref must equal it (registries are
/// keyed by release tag, which doubles as version). Without one, the
/// newest ref wins. `latest` is resolved through the releases API against
/// the program's repository.
fn locate_program(
    cache: &Cache,
    client: &HttpClient,
    program_name: &str,
    version: Option<&str>,
) -> Result<LocatedProgram> {
    let mut candidates = Vec::new();
    for (source, reference) in cache.list() {
        let Some(registry) = cache.load(&source, &reference)? else {
            continue;
        };
        if let Some(program) = registry.programs.get(program_name) {
            candidates.push(LocatedProgram {
                source,
                reference,
                program: program.clone(),
            });
        }
    }

    if candidates.is_empty() {
        return Err(Error::InstallationError(format!(
            "program '{program_name}' not found in any cached registry; try syncing first"
        )));
    }

    let version = match version {
        Some("latest") => {
            let repo = &candidates[0].program.repo;
            Some(client.get_latest_version(repo)?)
        }
        Some(version) => Some(version.to_string()),
        None => None,
    };

    match version {
        Some(version) => candidates
            .into_iter()
            .find(|c| c.reference == version)
            .ok_or_else(|| {
                Error::InstallationError(format!(
                    "program '{program_name}' version '{version}' not found in any cached registry"
                ))
            }),
        None => {
            // Deterministic without a version: the greatest ref wins
            candidates.sort_by(|a, b| a.reference.cmp(&b.reference));
            Ok(candidates.pop().expect("candidates is non-empty"))
        }
    }
}

/// Download the release asset into the archive cache, reusing a cached
/// archive only when its hash still matches the descriptor. A hash
/// mismatch never silently serves stale content, and a failed
/// verification leaves nothing behind at the cache path.
#[allow(clippy::too_many_arguments)]
fn download_asset(
    ctx: &Context,
    client: &HttpClient,
    program_name: &str,
    version: &str,
    platform: Platform,
    dist: &Binary,
    asset_url: &str,
    force: bool,
) -> Result<PathBuf> {
    let archive_path = ctx
        .cache_root
        .join("archives")
        .join(program_name)
        .join(version)
        .join(platform.tag())
        .join(&dist.asset);

    if archive_path.exists() && !force {
        match &dist.hash {
            Some(expected) if hash::verify_file(&archive_path, expected).is_ok() => {
                debug!("reusing cached archive {}", archive_path.display());
                return Ok(archive_path);
            }
            Some(_) => {
                info!("cached archive failed verification, re-downloading");
                fs::remove_file(&archive_path).map_err(|e| {
                    Error::IoError(format!("failed to remove stale archive: {e}"))
                })?;
            }
            None => {
                debug!("reusing cached archive {} (no hash declared)", archive_path.display());
                return Ok(archive_path);
            }
        }
    }

    let progress = download_progress(&dist.asset);
    let result = client.download_file(asset_url, &archive_path, Some(&progress));
    progress.finish_and_clear();
    result?;

    if let Some(expected) = &dist.hash {
        hash::verify_file_or_remove(&archive_path, expected)?;
    }

    Ok(archive_path)
}

/// Resolve the in-archive executable path: explicit distribution-level
/// path, then explicit program-level default, then auto-detection over the
/// archive listing, then the conventional fallback
fn resolve_exe_path(
    program_name: &str,
    program: &Program,
    dist: &Binary,
    platform: Platform,
    archive_path: &Path,
) -> Result<String> {
    if let Some(explicit) = dist.exe.as_deref().or(program.exe.as_deref()) {
        return Ok(with_platform_suffix(explicit, platform));
    }

    let listing = list_archive(archive_path)?;
    if let Some(detected) =
        detect_exe_path(&listing, program_name, platform, archive_stem(&dist.asset))
    {
        debug!("auto-detected executable path: {}", detected);
        return Ok(detected);
    }

    Ok(get_exe_path(
        program_name,
        program,
        dist,
        platform,
    ))
}

/// Styled progress bar for asset downloads
fn download_progress(name: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(name.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::collections::BTreeMap;

    fn registry_with_program(name: &str, version: &str) -> Registry {
        let mut programs = BTreeMap::new();
        programs.insert(
            name.to_string(),
            Program {
                version: version.to_string(),
                description: None,
                repo: "acme/demo".to_string(),
                license: None,
                exe: None,
                binaries: BTreeMap::from([(
                    "linux".to_string(),
                    Binary {
                        asset: format!("{name}-linux.zip"),
                        hash: None,
                        exe: None,
                    },
                )]),
            },
        );
        Registry {
            programs,
            ..Default::default()
        }
    }

    #[test]
    fn test_locate_program_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let client = HttpClient::new(None).unwrap();

        let result = locate_program(&cache, &client, "ghost", None);
        assert!(matches!(result, Err(Error::InstallationError(_))));
    }

    #[test]
    fn test_locate_program_by_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let client = HttpClient::new(None).unwrap();

        cache
            .save(&registry_with_program("demo", "1.0.0"), "progs", "1.0.0")
            .unwrap();
        cache
            .save(&registry_with_program("demo", "2.0.0"), "progs", "2.0.0")
            .unwrap();

        let located = locate_program(&cache, &client, "demo", Some("1.0.0")).unwrap();
        assert_eq!(located.reference, "1.0.0");
    }

    #[test]
    fn test_locate_program_wrong_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let client = HttpClient::new(None).unwrap();

        cache
            .save(&registry_with_program("demo", "1.0.0"), "progs", "1.0.0")
            .unwrap();

        let result = locate_program(&cache, &client, "demo", Some("9.9.9"));
        assert!(matches!(result, Err(Error::InstallationError(_))));
    }

    #[test]
    fn test_locate_program_without_version_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let client = HttpClient::new(None).unwrap();

        cache
            .save(&registry_with_program("demo", "1.0.0"), "progs", "1.0.0")
            .unwrap();
        cache
            .save(&registry_with_program("demo", "2.0.0"), "progs", "2.0.0")
            .unwrap();

        let located = locate_program(&cache, &client, "demo", None).unwrap();
        assert_eq!(located.reference, "2.0.0");
    }

    #[test]
    fn test_uninstall_requires_version_or_all() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());

        let result = uninstall(
            &ctx,
            &UninstallOptions {
                program: "demo".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InstallationError(_))));
    }

    #[test]
    fn test_uninstall_nonexistent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());

        let removed = uninstall(
            &ctx,
            &UninstallOptions {
                program: "ghost".to_string(),
                all_versions: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(removed.is_empty());
    }
}
