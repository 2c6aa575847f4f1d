// src/hash.rs

//! Content digests for artifact integrity
//!
//! Registry documents declare file and asset hashes as `algo:hex` strings
//! (SHA-256 in practice). This module parses those strings, computes file
//! digests, and verifies downloads against trusted metadata.

use crate::error::{Error, Result};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Buffer size for streaming file hashing (64 KB)
const HASH_BUFFER_SIZE: usize = 65536;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, the algorithm registry producers emit
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Hash output length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }

    /// Algorithm name as used in `algo:hex` strings
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(Error::ValidationError(format!(
                "unknown hash algorithm: {s}"
            ))),
        }
    }
}

/// A digest value with its algorithm, parsed from or rendered as `algo:hex`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest
    pub value: String,
}

impl Digest {
    /// Create a digest, validating length and hex characters
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self> {
        let value: String = value.into().to_lowercase();

        if value.len() != algorithm.hex_len() {
            return Err(Error::ValidationError(format!(
                "invalid {} digest length: expected {}, got {}",
                algorithm,
                algorithm.hex_len(),
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ValidationError(format!(
                "invalid hex in digest: {value}"
            )));
        }

        Ok(Self { algorithm, value })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

impl FromStr for Digest {
    type Err = Error;

    /// Parse an `algo:hex` string. A bare hex string is accepted as SHA-256
    /// for compatibility with older registry producers.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((algo, hex)) => Digest::new(algo.parse()?, hex),
            None => Digest::new(HashAlgorithm::Sha256, s),
        }
    }
}

/// Compute the SHA-256 digest of a file, streaming in chunks
pub fn hash_file(path: &Path) -> Result<Digest> {
    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("failed to open {}: {e}", path.display())))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Digest::new(HashAlgorithm::Sha256, hex::encode(hasher.finalize()))
}

/// Compute the SHA-256 digest of a byte slice
pub fn hash_bytes(data: &[u8]) -> Digest {
    Digest {
        algorithm: HashAlgorithm::Sha256,
        value: hex::encode(Sha256::digest(data)),
    }
}

/// Verify a file against an expected `algo:hex` digest string
pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
    let expected: Digest = expected.parse()?;
    let actual = hash_file(path)?;

    if actual != expected {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Verify a file, removing it on mismatch so a corrupt artifact never
/// persists at the cache path
pub fn verify_file_or_remove(path: &Path, expected: &str) -> Result<()> {
    if let Err(e) = verify_file(path, expected) {
        let _ = std::fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}
