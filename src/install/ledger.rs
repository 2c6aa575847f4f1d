// src/install/ledger.rs

//! Installation ledger
//!
//! One JSON file per program under `<root>/metadata/` records every
//! installation of that program. Multiple installations may coexist
//! (different versions and/or different install directories); uniqueness
//! is (version, bindir). The ledger is mutated only by add/remove.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provenance of an installed artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    /// Repository the asset was downloaded from
    pub repo: String,
    /// Release tag the asset was published under
    pub reference: String,
    /// Full asset download URL
    pub asset_url: String,
    /// Expected digest from the registry, when one was declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One recorded installation of a program
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Installation {
    pub version: String,
    pub platform: String,
    pub bindir: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub source: SourceInfo,
    /// Executable filenames placed in the bindir
    pub executables: Vec<String>,
}

impl Installation {
    /// Whether this entry matches a (version, bindir) uniqueness key
    fn matches(&self, version: &str, bindir: &Path) -> bool {
        self.version == version && self.bindir == bindir
    }
}

/// Per-program installation history, persisted as one JSON file
#[derive(Debug)]
pub struct Ledger {
    dir: PathBuf,
}

impl Ledger {
    /// Create a ledger store rooted at `<cache_root>/metadata`
    pub fn new(cache_root: &Path) -> Self {
        Self {
            dir: cache_root.join("metadata"),
        }
    }

    fn path(&self, program: &str) -> PathBuf {
        self.dir.join(format!("{program}.json"))
    }

    /// Load all recorded installations for a program; an absent ledger is
    /// an empty history
    pub fn load(&self, program: &str) -> Result<Vec<Installation>> {
        let path = self.path(program);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&path)
            .map_err(|e| Error::IoError(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::ValidationError(format!("malformed ledger {}: {e}", path.display())))
    }

    /// Record an installation: replaces any existing entry with the same
    /// (version, bindir), otherwise appends
    pub fn add(&self, program: &str, installation: Installation) -> Result<()> {
        let mut entries = self.load(program)?;
        entries.retain(|e| !e.matches(&installation.version, &installation.bindir));
        entries.push(installation);
        self.persist(program, &entries)
    }

    /// Remove entries matching the given filters; `None` matches anything.
    /// Returns the removed entries. Removing nothing is not an error.
    pub fn remove(
        &self,
        program: &str,
        version: Option<&str>,
        bindir: Option<&Path>,
    ) -> Result<Vec<Installation>> {
        let entries = self.load(program)?;
        let (removed, kept): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| {
            version.map(|v| e.version == v).unwrap_or(true)
                && bindir.map(|b| e.bindir == b).unwrap_or(true)
        });

        if !removed.is_empty() {
            if kept.is_empty() {
                let path = self.path(program);
                if path.exists() {
                    fs::remove_file(&path).map_err(|e| {
                        Error::IoError(format!("failed to remove {}: {e}", path.display()))
                    })?;
                }
            } else {
                self.persist(program, &kept)?;
            }
        }

        Ok(removed)
    }

    /// List programs that have a ledger on disk
    pub fn programs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut programs: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .collect();
        programs.sort();
        programs
    }

    fn persist(&self, program: &str, entries: &[Installation]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::IoError(format!("failed to create {}: {e}", self.dir.display())))?;

        let path = self.path(program);
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::ValidationError(format!("failed to serialize ledger: {e}")))?;
        fs::write(&path, text)
            .map_err(|e| Error::IoError(format!("failed to write {}: {e}", path.display())))?;

        debug!("persisted ledger for {} ({} entries)", program, entries.len());
        Ok(())
    }
}
