// src/lib.rs

//! Quarry
//!
//! A remote-artifact registry client: discovers versioned registry
//! documents published by third-party repositories, caches them locally,
//! and installs platform-specific program binaries from release assets.
//!
//! # Architecture
//!
//! - Bootstrap: bundled source configuration with a user overlay
//! - Discovery: two-tier fallback (release asset, then version-controlled)
//! - Cache: content-addressed on-disk store keyed by (source, ref)
//! - Sync: idempotent batch orchestration with partial-failure accounting
//! - Install: download, verify, extract, install, and track binaries

pub mod cache;
pub mod config;
pub mod context;
pub mod discovery;
mod error;
pub mod hash;
pub mod install;
pub mod net;
pub mod registry;
pub mod sync;

pub use cache::Cache;
pub use config::{BootstrapConfig, SourceConfig};
pub use context::Context;
pub use discovery::{discover, Discovered, DiscoveryMode};
pub use error::{Error, Result};
pub use install::{install, uninstall, InstallOptions, Installation, Platform, UninstallOptions};
pub use registry::{Binary, FileEntry, Program, Registry};
pub use sync::{sync, try_sync_best_effort, SyncOptions, SyncResult, SyncStatus};
