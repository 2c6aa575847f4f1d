// src/error.rs

//! Error types for the quarry library
//!
//! One crate-wide error enum. Discovery and installation raise; the sync
//! orchestrator catches per-pair failures and folds them into its result,
//! and the CLI maps anything that propagates to a non-zero exit code.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed bootstrap or user configuration document
    #[error("config error: {0}")]
    ConfigError(String),

    /// Registry or component genuinely absent at the given ref
    #[error("not found: {0}")]
    NotFoundError(String),

    /// Network or parse failure during registry discovery, distinct from
    /// "absent" (which is `NotFoundError`)
    #[error("discovery error: {0}")]
    DiscoveryError(String),

    /// Installation failure: unsupported platform, missing distribution,
    /// malformed archive, executable not found post-extraction
    #[error("installation error: {0}")]
    InstallationError(String),

    /// Malformed registry content (e.g. a file entry with neither url nor path)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Download failed after retries
    #[error("download error: {0}")]
    DownloadError(String),

    /// Server responded with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Downloaded content does not match the expected digest
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
