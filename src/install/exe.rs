// src/install/exe.rs

//! In-archive executable path resolution
//!
//! Resolution priority: an explicit per-distribution path, then an explicit
//! per-program default, then auto-detection over the archive's file
//! listing, then the conventional `bin/<program>` fallback. Auto-detection
//! is a pure function over a listing so it can be exercised with synthetic
//! listings instead of real archives.

use super::platform::Platform;
use crate::registry::{Binary, Program};

/// Prefixes an executable may live under, in search order
const EXE_PREFIXES: [&str; 2] = ["bin/", ""];

/// Extensions an executable may carry, ordered by likelihood per platform
const fn exe_extensions(platform: Platform) -> [&'static str; 5] {
    if platform.is_windows() {
        [".exe", "", ".dll", ".so", ".dylib"]
    } else {
        ["", ".so", ".dylib", ".exe", ".dll"]
    }
}

/// Append `.exe` on Windows platforms, without doubling an existing suffix
pub fn with_platform_suffix(path: &str, platform: Platform) -> String {
    if platform.is_windows() && !path.ends_with(".exe") {
        format!("{path}.exe")
    } else {
        path.to_string()
    }
}

/// Resolve the executable path from explicit metadata alone: the
/// distribution-level `exe` wins over the program-level default, and the
/// conventional `bin/<program>` is the final fallback.
pub fn get_exe_path(program_name: &str, program: &Program, dist: &Binary, platform: Platform) -> String {
    let path = dist
        .exe
        .as_deref()
        .or(program.exe.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| format!("bin/{program_name}"));

    with_platform_suffix(&path, platform)
}

/// Auto-detect the executable path by searching an archive listing.
///
/// Both a flat layout (`bin/prog`, `prog`) and a nested-under-archive-stem
/// layout (`<stem>/bin/prog`, `<stem>/prog`) are recognized, so registry
/// authors never have to declare which one their archives use. Returns the
/// matched path relative to the archive root, or `None`.
pub fn detect_exe_path(
    listing: &[String],
    program_name: &str,
    platform: Platform,
    archive_stem: &str,
) -> Option<String> {
    let roots = ["", archive_stem];

    for root in roots {
        for prefix in EXE_PREFIXES {
            for ext in exe_extensions(platform) {
                let candidate = if root.is_empty() {
                    format!("{prefix}{program_name}{ext}")
                } else {
                    format!("{root}/{prefix}{program_name}{ext}")
                };
                if listing.iter().any(|name| name == &candidate) {
                    return Some(candidate);
                }
            }
        }
    }

    None
}
