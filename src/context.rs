// src/context.rs

//! Process-wide context
//!
//! A single `Context` value is constructed at program start (or by a test)
//! and passed to the components that need it. It carries the cache root,
//! optional bootstrap/user-config path overrides, the auto-sync opt-out,
//! and the artifact-host auth token.

use std::cell::Cell;
use std::path::PathBuf;

/// Application name, used for platform cache and config directories
pub const APP_NAME: &str = "quarry";

/// Environment variable that disables the best-effort auto-sync warm-up
pub const NO_AUTO_SYNC_ENV: &str = "QUARRY_NO_AUTO_SYNC";

/// Environment variable holding an artifact-host auth token; attached as a
/// bearer header to raise rate limits
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Process-wide context for cache, configuration, and network access
#[derive(Debug)]
pub struct Context {
    /// Root directory for all on-disk state (registries, archives,
    /// binaries, ledgers)
    pub cache_root: PathBuf,
    /// Explicit bootstrap document path; `None` uses the bundled document
    pub bootstrap_path: Option<PathBuf>,
    /// Explicit user-overlay document path; `None` uses the platform default
    pub user_config_path: Option<PathBuf>,
    /// Whether the best-effort auto-sync warm-up is enabled
    pub auto_sync: bool,
    /// Auth token for artifact-host requests
    pub token: Option<String>,
    /// Latch ensuring the warm-up runs at most once per process
    sync_attempted: Cell<bool>,
}

impl Context {
    /// Build a context from the environment and platform defaults
    pub fn from_env() -> Self {
        let cache_root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            cache_root,
            bootstrap_path: None,
            user_config_path: None,
            auto_sync: std::env::var_os(NO_AUTO_SYNC_ENV).is_none(),
            token: std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            sync_attempted: Cell::new(false),
        }
    }

    /// Build a context rooted at an explicit cache directory, with
    /// auto-sync disabled. Used by tests and embedders.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            bootstrap_path: None,
            user_config_path: None,
            auto_sync: false,
            token: None,
            sync_attempted: Cell::new(false),
        }
    }

    /// Platform user-config path for the bootstrap overlay:
    /// `$XDG_CONFIG_HOME/quarry/bootstrap.toml` on Unix,
    /// `%APPDATA%\quarry\bootstrap.toml` on Windows
    pub fn default_user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join("bootstrap.toml"))
    }

    /// Whether the best-effort warm-up should run now; flips the
    /// once-per-process latch on first call
    pub fn take_sync_attempt(&self) -> bool {
        if !self.auto_sync || self.sync_attempted.get() {
            return false;
        }
        self.sync_attempted.set(true);
        true
    }
}
