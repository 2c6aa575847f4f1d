// src/commands.rs
//! Command handlers for the quarry CLI

use anyhow::Result;
use quarry::cache::Cache;
use quarry::context::Context;
use quarry::install::{
    self, InstallOptions, Platform, UninstallOptions,
};
use quarry::sync::{self, SyncOptions};
use std::path::PathBuf;
use tracing::info;

/// Split a `program[@version]` argument into its parts
fn parse_program_spec(spec: &str) -> (String, Option<String>) {
    match spec.split_once('@') {
        Some((program, version)) => (program.to_string(), Some(version.to_string())),
        None => (spec.to_string(), None),
    }
}

/// `sync` command handler
pub fn cmd_sync(
    ctx: &Context,
    source: Option<String>,
    reference: Option<String>,
    force: bool,
) -> Result<()> {
    let result = sync::sync(
        ctx,
        &SyncOptions {
            source,
            reference,
            force,
        },
    )?;

    for (source, reference) in &result.synced {
        println!("synced   {source}@{reference}");
    }
    for (source, reference, reason) in &result.skipped {
        println!("skipped  {source}@{reference} ({reason})");
    }
    for (source, reference, error) in &result.failed {
        println!("failed   {source}@{reference}: {error}");
    }

    println!(
        "\n{} synced, {} skipped, {} failed",
        result.synced.len(),
        result.skipped.len(),
        result.failed.len()
    );

    if !result.failed.is_empty() {
        anyhow::bail!("{} pair(s) failed to sync", result.failed.len());
    }
    Ok(())
}

/// `info` command handler
pub fn cmd_info(ctx: &Context) -> Result<()> {
    let status = sync::sync_status(ctx)?;

    if status.is_empty() {
        println!("No registry sources configured");
        return Ok(());
    }

    println!("Registry sources:\n");
    for (name, source_status) in &status {
        println!("{name} ({})", source_status.repo);
        let cached = if source_status.cached_refs.is_empty() {
            "none".to_string()
        } else {
            source_status.cached_refs.join(", ")
        };
        println!("  Cached: {cached}");
        if !source_status.missing_refs.is_empty() {
            println!("  Missing: {}", source_status.missing_refs.join(", "));
        }
        println!();
    }
    Ok(())
}

/// `list` command handler
pub fn cmd_list(
    ctx: &Context,
    source: Option<String>,
    reference: Option<String>,
    verbose: bool,
) -> Result<()> {
    sync::try_sync_best_effort(ctx);

    let cache = Cache::new(&ctx.cache_root);
    let cached: Vec<(String, String)> = cache
        .list()
        .into_iter()
        .filter(|(s, r)| {
            source.as_deref().map(|want| s == want).unwrap_or(true)
                && reference.as_deref().map(|want| r == want).unwrap_or(true)
        })
        .collect();

    if cached.is_empty() {
        println!("No cached registries. Run 'quarry sync' first.");
        return Ok(());
    }

    for (source, reference) in cached {
        let Some(registry) = cache.load(&source, &reference)? else {
            continue;
        };
        println!("{source}@{reference}:");
        if !registry.programs.is_empty() {
            println!("  Programs: {}", registry.programs.len());
            if verbose {
                for (name, program) in &registry.programs {
                    let platforms: Vec<&str> =
                        program.binaries.keys().map(String::as_str).collect();
                    println!(
                        "    {name} {} [{}]",
                        program.version,
                        platforms.join(", ")
                    );
                }
            }
        }
        if !registry.files.is_empty() {
            println!("  Files: {}", registry.files.len());
            if verbose {
                for name in registry.files.keys() {
                    println!("    {name}");
                }
            }
        }
        if !registry.models.is_empty() {
            println!("  Models: {}", registry.models.len());
            if verbose {
                for (name, files) in &registry.models {
                    println!("    {name} ({} files)", files.len());
                }
            }
        }
        println!();
    }
    Ok(())
}

/// `clean` command handler
pub fn cmd_clean(
    ctx: &Context,
    source: Option<String>,
    reference: Option<String>,
    all: bool,
    force: bool,
) -> Result<()> {
    if source.is_none() && !all {
        anyhow::bail!("pass --source to clear one source, or --all to clear everything");
    }

    if all && !force {
        print!("Clear the entire registry cache? [y/N] ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if !matches!(line.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted");
            return Ok(());
        }
    }

    let cache = Cache::new(&ctx.cache_root);
    cache.clear(source.as_deref(), reference.as_deref())?;

    match (&source, &reference) {
        (Some(source), Some(reference)) => println!("Cleared {source}@{reference}"),
        (Some(source), None) => println!("Cleared all refs for {source}"),
        _ => println!("Cleared registry cache"),
    }
    Ok(())
}

/// `install` command handler
pub fn cmd_install(
    ctx: &Context,
    program_spec: String,
    version: Option<String>,
    bindir: Option<String>,
    platform: Option<String>,
    force: bool,
) -> Result<()> {
    sync::try_sync_best_effort(ctx);

    let (program, spec_version) = parse_program_spec(&program_spec);
    let version = spec_version.or(version);

    let bindir = match bindir {
        Some(spec) if spec.starts_with(':') => {
            Some(install::select_bindir(ctx, &spec, &program)?)
        }
        Some(path) => Some(PathBuf::from(path)),
        None => None,
    };

    let platform = platform.map(|p| p.parse::<Platform>()).transpose()?;

    let paths = install::install(
        ctx,
        &InstallOptions {
            program,
            version,
            bindir,
            platform,
            force,
        },
    )?;

    println!("Installed executables:");
    for path in paths {
        println!("  {}", path.display());
    }
    Ok(())
}

/// `uninstall` command handler
pub fn cmd_uninstall(
    ctx: &Context,
    program_spec: String,
    bindir: Option<String>,
    all_versions: bool,
    remove_cache: bool,
) -> Result<()> {
    let (program, version) = parse_program_spec(&program_spec);

    if version.is_none() && !all_versions {
        anyhow::bail!("specify a version (program@version) or use --all");
    }

    let removed = install::uninstall(
        ctx,
        &UninstallOptions {
            program: program.clone(),
            version,
            bindir: bindir.map(PathBuf::from),
            all_versions,
            remove_cache,
        },
    )?;

    if removed.is_empty() {
        println!("No matching installations of {program}");
    } else {
        for entry in &removed {
            println!("Uninstalled {program}@{} from {}", entry.version, entry.bindir.display());
        }
    }
    Ok(())
}

/// `history` command handler
pub fn cmd_history(ctx: &Context, program: Option<String>, verbose: bool) -> Result<()> {
    let installed = install::list_installed(ctx, program.as_deref())?;

    if installed.is_empty() {
        match program {
            Some(program) => println!("No installations found for {program}"),
            None => println!("No programs installed"),
        }
        return Ok(());
    }

    println!("Installation history:\n");
    for (name, installations) in &installed {
        println!("{name}:");
        for entry in installations {
            println!("  {} in {}", entry.version, entry.bindir.display());
            if verbose {
                println!("    Platform: {}", entry.platform);
                println!(
                    "    Installed: {}",
                    entry.installed_at.format("%Y-%m-%d %H:%M:%S")
                );
                println!("    Executables: {}", entry.executables.join(", "));
            }
        }
        println!();
    }

    info!("listed {} program(s)", installed.len());
    Ok(())
}
