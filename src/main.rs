// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use quarry::Context;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut ctx = Context::from_env();
    if let Some(bootstrap) = cli.bootstrap {
        ctx.bootstrap_path = Some(PathBuf::from(bootstrap));
    }

    match cli.command {
        Commands::Sync {
            source,
            reference,
            force,
        } => commands::cmd_sync(&ctx, source, reference, force),
        Commands::Info => commands::cmd_info(&ctx),
        Commands::List {
            source,
            reference,
            verbose,
        } => commands::cmd_list(&ctx, source, reference, verbose),
        Commands::Clean {
            source,
            reference,
            all,
            force,
        } => commands::cmd_clean(&ctx, source, reference, all, force),
        Commands::Install {
            program,
            version,
            bindir,
            platform,
            force,
        } => commands::cmd_install(&ctx, program, version, bindir, platform, force),
        Commands::Uninstall {
            program,
            bindir,
            all_versions,
            remove_cache,
        } => commands::cmd_uninstall(&ctx, program, bindir, all_versions, remove_cache),
        Commands::History { program, verbose } => commands::cmd_history(&ctx, program, verbose),
    }
}
