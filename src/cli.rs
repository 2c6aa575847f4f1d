// src/cli.rs
//! CLI definitions for quarry
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(author = "Quarry Project")]
#[command(version)]
#[command(about = "Registry discovery, caching, and installation for remote artifacts", long_about = None)]
pub struct Cli {
    /// Path to an explicit bootstrap document (default: bundled)
    #[arg(long, global = true)]
    pub bootstrap: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize registries into the local cache
    Sync {
        /// Specific source to sync (default: all configured sources)
        #[arg(long)]
        source: Option<String>,

        /// Specific ref to sync (default: all configured refs)
        #[arg(long = "ref")]
        reference: Option<String>,

        /// Re-fetch even if already cached
        #[arg(long)]
        force: bool,
    },

    /// Show sync status for all configured sources
    Info,

    /// List cached registries and their contents
    List {
        /// Filter by source name
        #[arg(long)]
        source: Option<String>,

        /// Filter by ref
        #[arg(long = "ref")]
        reference: Option<String>,

        /// Show detailed registry contents
        #[arg(short, long)]
        verbose: bool,
    },

    /// Clear cached registries
    #[command(alias = "clear")]
    Clean {
        /// Clear only this source
        #[arg(long)]
        source: Option<String>,

        /// Clear only this ref (requires --source)
        #[arg(long = "ref", requires = "source")]
        reference: Option<String>,

        /// Clear the entire registry cache
        #[arg(long, conflicts_with_all = ["source", "reference"])]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Install a program from a cached registry
    Install {
        /// Program name, optionally with @version (e.g. demo@1.2.3)
        program: String,

        /// Program version (if not given in the program argument)
        #[arg(long)]
        version: Option<String>,

        /// Installation directory: a path, or a shortcut starting with ':'.
        /// Use ':' alone for interactive selection. Available shortcuts:
        /// :prev, :cargo, :local, :system (Unix), :appdata (Windows)
        #[arg(long)]
        bindir: Option<String>,

        /// Platform tag: linux, mac, macarm, win64 (default: auto-detect)
        #[arg(long)]
        platform: Option<String>,

        /// Force re-download and re-extraction
        #[arg(long)]
        force: bool,
    },

    /// Uninstall a program
    Uninstall {
        /// Program name, optionally with @version
        program: String,

        /// Restrict removal to one install directory (default: all)
        #[arg(long)]
        bindir: Option<String>,

        /// Uninstall all installed versions
        #[arg(long = "all")]
        all_versions: bool,

        /// Also remove the program's archive and binary caches
        #[arg(long)]
        remove_cache: bool,
    },

    /// Show installation history
    History {
        /// Specific program to show (default: all)
        program: Option<String>,

        /// Show detailed installation information
        #[arg(short, long)]
        verbose: bool,
    },
}
