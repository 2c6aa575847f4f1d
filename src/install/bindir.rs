// src/install/bindir.rs

//! Install directory resolution
//!
//! When no bindir is supplied, a priority-ordered list of candidate
//! writable directories is consulted and the first writable one wins. A
//! `:shortcut` addressing scheme lets callers pick a named candidate
//! directly; bare `:` presents an interactive numbered menu.

use super::ledger::Ledger;
use crate::context::Context;
use crate::error::{Error, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named bindir candidate
#[derive(Debug, Clone)]
pub struct BindirCandidate {
    /// Shortcut name, without the leading `:`
    pub shortcut: &'static str,
    pub description: &'static str,
    pub path: PathBuf,
}

/// Probe whether a directory is writable by creating and removing a marker
/// file; the directory is created first if missing
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join(".quarry-write-test");
    match std::fs::File::create(&marker) {
        Ok(file) => {
            drop(file);
            let _ = std::fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}

/// Build the candidate list for a program, in priority order. Candidates
/// whose base directory cannot be determined on this host are omitted.
pub fn candidates(ctx: &Context, program: &str) -> Vec<BindirCandidate> {
    let mut list = Vec::new();

    // Highest priority: wherever this program was installed last
    let ledger = Ledger::new(&ctx.cache_root);
    if let Ok(entries) = ledger.load(program) {
        if let Some(last) = entries.last() {
            list.push(BindirCandidate {
                shortcut: "prev",
                description: "previous install location",
                path: last.bindir.clone(),
            });
        }
    }

    if let Some(home) = dirs::home_dir() {
        list.push(BindirCandidate {
            shortcut: "cargo",
            description: "cargo bin directory",
            path: home.join(".cargo").join("bin"),
        });
        if cfg!(not(windows)) {
            list.push(BindirCandidate {
                shortcut: "local",
                description: "user-local bin directory",
                path: home.join(".local").join("bin"),
            });
        }
    }

    if cfg!(not(windows)) {
        list.push(BindirCandidate {
            shortcut: "system",
            description: "system-local bin directory",
            path: PathBuf::from("/usr/local/bin"),
        });
    }

    if cfg!(windows) {
        if let Some(data_dir) = dirs::data_local_dir() {
            list.push(BindirCandidate {
                shortcut: "appdata",
                description: "application data bin directory",
                path: data_dir.join(crate::context::APP_NAME).join("bin"),
            });
        }
    }

    list
}

/// Resolve the install directory automatically: the first writable
/// candidate in priority order
pub fn resolve_bindir(ctx: &Context, program: &str) -> Result<PathBuf> {
    for candidate in candidates(ctx, program) {
        if is_writable(&candidate.path) {
            debug!(
                "selected bindir {} (:{})",
                candidate.path.display(),
                candidate.shortcut
            );
            return Ok(candidate.path);
        }
    }

    Err(Error::InstallationError(
        "no writable install directory found; pass --bindir explicitly".to_string(),
    ))
}

/// Resolve a `:shortcut` bindir specification.
///
/// A bare `:` presents a numbered menu on the terminal. A named shortcut
/// (`:prev`, `:cargo`, ...) selects that candidate directly; an unknown
/// name or an unwritable selection is an error.
pub fn select_bindir(ctx: &Context, spec: &str, program: &str) -> Result<PathBuf> {
    let name = spec.trim_start_matches(':');
    let list = candidates(ctx, program);

    if name.is_empty() {
        return prompt_bindir(&list);
    }

    let candidate = list
        .iter()
        .find(|c| c.shortcut == name)
        .ok_or_else(|| {
            let known: Vec<String> = list.iter().map(|c| format!(":{}", c.shortcut)).collect();
            Error::InstallationError(format!(
                "unknown bindir shortcut ':{name}' (available: {})",
                known.join(", ")
            ))
        })?;

    if !is_writable(&candidate.path) {
        return Err(Error::InstallationError(format!(
            "bindir {} (:{}) is not writable",
            candidate.path.display(),
            candidate.shortcut
        )));
    }

    Ok(candidate.path.clone())
}

/// Interactive numbered-menu selection on stdin/stdout
fn prompt_bindir(list: &[BindirCandidate]) -> Result<PathBuf> {
    if list.is_empty() {
        return Err(Error::InstallationError(
            "no install directory candidates available".to_string(),
        ));
    }

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Select install directory:").map_err(Error::from)?;
    for (i, candidate) in list.iter().enumerate() {
        writeln!(
            stdout,
            "  {}. {} ({}, :{})",
            i + 1,
            candidate.path.display(),
            candidate.description,
            candidate.shortcut
        )
        .map_err(Error::from)?;
    }
    write!(stdout, "Enter number [1]: ").map_err(Error::from)?;
    stdout.flush().map_err(Error::from)?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).map_err(Error::from)?;
    let line = line.trim();

    let index = if line.is_empty() {
        0
    } else {
        line.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&n| n < list.len())
            .ok_or_else(|| {
                Error::InstallationError(format!("invalid selection: {line}"))
            })?
    };

    let candidate = &list[index];
    if !is_writable(&candidate.path) {
        return Err(Error::InstallationError(format!(
            "bindir {} is not writable",
            candidate.path.display()
        )));
    }
    Ok(candidate.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::ledger::{Installation, SourceInfo};
    use chrono::Utc;

    #[test]
    fn test_candidates_include_prev_after_install() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());
        let bindir = dir.path().join("somewhere/bin");

        let ledger = Ledger::new(&ctx.cache_root);
        ledger
            .add(
                "demo",
                Installation {
                    version: "1.0.0".to_string(),
                    platform: "linux".to_string(),
                    bindir: bindir.clone(),
                    installed_at: Utc::now(),
                    source: SourceInfo {
                        repo: "acme/demo".to_string(),
                        reference: "1.0.0".to_string(),
                        asset_url: "https://example.com/demo.zip".to_string(),
                        hash: None,
                    },
                    executables: vec!["demo".to_string()],
                },
            )
            .unwrap();

        let list = candidates(&ctx, "demo");
        assert_eq!(list[0].shortcut, "prev");
        assert_eq!(list[0].path, bindir);
    }

    #[test]
    fn test_candidates_without_history_have_no_prev() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());

        let list = candidates(&ctx, "demo");
        assert!(list.iter().all(|c| c.shortcut != "prev"));
    }

    #[test]
    fn test_select_unknown_shortcut_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());

        let result = select_bindir(&ctx, ":nonsense", "demo");
        assert!(matches!(result, Err(Error::InstallationError(_))));
    }

    #[test]
    fn test_select_prev_shortcut() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_cache_root(dir.path());
        let bindir = dir.path().join("bin");
        std::fs::create_dir_all(&bindir).unwrap();

        let ledger = Ledger::new(&ctx.cache_root);
        ledger
            .add(
                "demo",
                Installation {
                    version: "1.0.0".to_string(),
                    platform: "linux".to_string(),
                    bindir: bindir.clone(),
                    installed_at: Utc::now(),
                    source: SourceInfo {
                        repo: "acme/demo".to_string(),
                        reference: "1.0.0".to_string(),
                        asset_url: "https://example.com/demo.zip".to_string(),
                        hash: None,
                    },
                    executables: vec!["demo".to_string()],
                },
            )
            .unwrap();

        let selected = select_bindir(&ctx, ":prev", "demo").unwrap();
        assert_eq!(selected, bindir);
    }

    #[test]
    fn test_is_writable_probe() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_writable(&dir.path().join("new-subdir")));
    }
}
