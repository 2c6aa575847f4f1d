// src/cache.rs

//! On-disk registry cache
//!
//! Registry documents are cached under
//! `<root>/registries/<source>/<ref>/registry.toml`. Source names may
//! contain path separators; nested namespacing is intentional. Writes are
//! guarded by an advisory lock file colocated with the target so two
//! processes racing to populate the same (source, ref) do not interleave
//! partial writes; the lock carries no cross-host guarantees.

use crate::error::{Error, Result};
use crate::registry::{Registry, REGISTRY_FILENAME};
use fs2::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Maximum attempts when removing cache entries (Windows keeps just-closed
/// handles alive briefly)
const REMOVE_MAX_RETRIES: u32 = 5;

/// Delay between removal attempts
const REMOVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Content-addressed cache of registry documents
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Create a cache rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all cached registries
    pub fn registries_dir(&self) -> PathBuf {
        self.root.join("registries")
    }

    /// Cache directory for one (source, ref)
    pub fn entry_dir(&self, source: &str, reference: &str) -> PathBuf {
        self.registries_dir().join(source).join(reference)
    }

    /// Path of the cached registry file for one (source, ref)
    pub fn entry_path(&self, source: &str, reference: &str) -> PathBuf {
        self.entry_dir(source, reference).join(REGISTRY_FILENAME)
    }

    /// Serialize a registry into the cache, creating directories as needed.
    ///
    /// The write is wrapped in an advisory file lock and lands via a temp
    /// file plus atomic rename, so concurrent writers of the same entry
    /// cannot interleave and readers never observe a partial document.
    pub fn save(&self, registry: &Registry, source: &str, reference: &str) -> Result<PathBuf> {
        let dir = self.entry_dir(source, reference);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::IoError(format!("failed to create {}: {e}", dir.display())))?;

        let lock_path = dir.join(".lock");
        let lock_file = File::create(&lock_path)
            .map_err(|e| Error::IoError(format!("failed to create lock file: {e}")))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| Error::IoError(format!("failed to acquire cache lock: {e}")))?;

        let target = dir.join(REGISTRY_FILENAME);
        let result = self.write_entry(registry, &dir, &target);

        // Lock released when the handle closes
        let _ = fs2::FileExt::unlock(&lock_file);
        result?;

        debug!("cached registry for {}@{}", source, reference);
        Ok(target)
    }

    fn write_entry(&self, registry: &Registry, dir: &Path, target: &Path) -> Result<()> {
        let text = registry.to_toml()?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::IoError(format!("failed to create temp file: {e}")))?;
        temp.write_all(text.as_bytes())
            .map_err(|e| Error::IoError(format!("failed to write registry: {e}")))?;
        temp.persist(target)
            .map_err(|e| Error::IoError(format!("failed to persist registry: {e}")))?;
        Ok(())
    }

    /// Load a cached registry; absence is `Ok(None)`, not an error
    pub fn load(&self, source: &str, reference: &str) -> Result<Option<Registry>> {
        let path = self.entry_path(source, reference);
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path)
            .map_err(|e| Error::IoError(format!("failed to read {}: {e}", path.display())))?;
        Ok(Some(Registry::parse(&text)?))
    }

    /// Existence check without deserialization
    pub fn has(&self, source: &str, reference: &str) -> bool {
        self.entry_path(source, reference).exists()
    }

    /// List all cached (source, ref) pairs.
    ///
    /// Sources containing `/` are recovered by treating every path segment
    /// except the last two (ref, filename) as the source.
    pub fn list(&self) -> Vec<(String, String)> {
        let registries = self.registries_dir();
        if !registries.exists() {
            return Vec::new();
        }

        let mut cached = Vec::new();
        for entry in WalkDir::new(&registries)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == REGISTRY_FILENAME)
        {
            let Ok(relative) = entry.path().strip_prefix(&registries) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            // parts = [source..., ref, "registry.toml"]
            if parts.len() >= 3 {
                let reference = parts[parts.len() - 2].clone();
                let source = parts[..parts.len() - 2].join("/");
                cached.push((source, reference));
            }
        }

        cached.sort();
        cached
    }

    /// Clear cached registries at one of three granularities: everything,
    /// everything under a source, or exactly one (source, ref)
    pub fn clear(&self, source: Option<&str>, reference: Option<&str>) -> Result<()> {
        let dir = match (source, reference) {
            (Some(source), Some(reference)) => self.entry_dir(source, reference),
            (Some(source), None) => self.registries_dir().join(source),
            (None, _) => self.registries_dir(),
        };

        if dir.exists() {
            remove_dir_all_with_retry(&dir)?;
        }
        Ok(())
    }
}

/// Remove a directory tree, retrying on transient permission errors.
///
/// On Windows a just-closed file handle can keep its path unremovable for
/// a short window; bounded retries with a delay cover it, the last error
/// is re-raised on exhaustion.
fn remove_dir_all_with_retry(path: &Path) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied
                && attempt < REMOVE_MAX_RETRIES =>
            {
                warn!(
                    "removal of {} blocked (attempt {}), retrying",
                    path.display(),
                    attempt
                );
                std::thread::sleep(REMOVE_RETRY_DELAY);
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "failed to remove {}: {e}",
                    path.display()
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Binary, Program};
    use std::collections::BTreeMap;

    fn sample_registry() -> Registry {
        let mut programs = BTreeMap::new();
        programs.insert(
            "demo".to_string(),
            Program {
                version: "1.0.0".to_string(),
                description: None,
                repo: "acme/demo".to_string(),
                license: None,
                exe: None,
                binaries: BTreeMap::from([(
                    "linux".to_string(),
                    Binary {
                        asset: "demo-linux.zip".to_string(),
                        hash: None,
                        exe: None,
                    },
                )]),
            },
        );
        Registry {
            schema_version: Some("1.0".to_string()),
            programs,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let registry = sample_registry();

        let path = cache.save(&registry, "demo-suite", "v1.0.0").unwrap();
        assert!(path.exists());

        let loaded = cache.load("demo-suite", "v1.0.0").unwrap().unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());

        assert!(cache.load("nope", "v0").unwrap().is_none());
        assert!(!cache.has("nope", "v0"));
    }

    #[test]
    fn test_list_recovers_nested_sources() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let registry = sample_registry();

        cache.save(&registry, "plain", "v1").unwrap();
        cache.save(&registry, "org/suite", "v2").unwrap();
        cache.save(&registry, "org/suite", "v3").unwrap();

        let listed = cache.list();
        assert_eq!(
            listed,
            vec![
                ("org/suite".to_string(), "v2".to_string()),
                ("org/suite".to_string(), "v3".to_string()),
                ("plain".to_string(), "v1".to_string()),
            ]
        );
    }

    #[test]
    fn test_clear_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let registry = sample_registry();

        cache.save(&registry, "a", "v1").unwrap();
        cache.save(&registry, "a", "v2").unwrap();

        cache.clear(Some("a"), Some("v1")).unwrap();
        assert!(!cache.has("a", "v1"));
        assert!(cache.has("a", "v2"));
    }

    #[test]
    fn test_clear_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let registry = sample_registry();

        cache.save(&registry, "a", "v1").unwrap();
        cache.save(&registry, "b", "v1").unwrap();

        cache.clear(Some("a"), None).unwrap();
        assert!(!cache.has("a", "v1"));
        assert!(cache.has("b", "v1"));
    }

    #[test]
    fn test_clear_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let registry = sample_registry();

        cache.save(&registry, "a", "v1").unwrap();
        cache.save(&registry, "org/b", "v1").unwrap();

        cache.clear(None, None).unwrap();
        assert!(cache.list().is_empty());
    }

    #[test]
    fn test_clear_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());

        assert!(cache.clear(Some("ghost"), None).is_ok());
    }
}
