// src/install/platform.rs

//! Platform tags for binary distributions
//!
//! Registries key binary distributions by a small fixed set of platform
//! tags. Host detection maps the running OS/architecture to one of them;
//! unsupported combinations fail explicitly rather than guessing.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A supported binary platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux (x86_64 and aarch64 share one distribution tag)
    Linux,
    /// macOS on Intel
    Mac,
    /// macOS on Apple Silicon
    MacArm,
    /// 64-bit Windows
    Win64,
}

impl Platform {
    /// The registry key for this platform
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Mac => "mac",
            Self::MacArm => "macarm",
            Self::Win64 => "win64",
        }
    }

    /// Whether executables on this platform carry an `.exe` suffix
    pub const fn is_windows(&self) -> bool {
        matches!(self, Self::Win64)
    }

    /// All supported platform tags
    pub const fn all() -> [Platform; 4] {
        [Self::Linux, Self::Mac, Self::MacArm, Self::Win64]
    }

    /// Detect the host platform from OS and architecture
    pub fn detect() -> Result<Self> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map an (os, arch) pair to a platform tag
    pub fn from_os_arch(os: &str, arch: &str) -> Result<Self> {
        match (os, arch) {
            ("linux", "x86_64" | "aarch64") => Ok(Self::Linux),
            ("macos", "x86_64") => Ok(Self::Mac),
            ("macos", "aarch64") => Ok(Self::MacArm),
            ("windows", "x86_64") => Ok(Self::Win64),
            _ => Err(Error::InstallationError(format!(
                "unsupported platform: {os}/{arch}"
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "mac" => Ok(Self::Mac),
            "macarm" => Ok(Self::MacArm),
            "win64" => Ok(Self::Win64),
            _ => Err(Error::InstallationError(format!(
                "unknown platform '{s}' (expected one of: linux, mac, macarm, win64)"
            ))),
        }
    }
}
