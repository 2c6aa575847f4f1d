// src/net.rs

//! HTTP client for registry discovery and asset downloads
//!
//! Wraps reqwest's blocking client with a bounded timeout, retry support
//! for transport failures, and token authentication for artifact-host
//! requests. HTTP status errors are surfaced distinctly from transport
//! errors and are never retried: discovery's release-asset fallback needs
//! to tell a 404 apart from everything else.

use crate::error::{Error, Result};
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transport failures
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, scaled linearly by attempt
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Hosts that receive the auth token when one is configured
const TOKEN_HOSTS: [&str; 2] = ["github.com", "api.github.com"];

/// Release info from the artifact-host releases API
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
}

/// HTTP client wrapper with retry and token support
pub struct HttpClient {
    client: Client,
    token: Option<String>,
    max_retries: u32,
}

impl HttpClient {
    /// Create a client; `token` is attached as a bearer header on requests
    /// to the artifact host to raise rate limits
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::IoError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            max_retries: MAX_RETRIES,
        })
    }

    fn request(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(token) = &self.token {
            if TOKEN_HOSTS.iter().any(|host| url.contains(host)) {
                req = req.bearer_auth(token);
            }
        }
        req
    }

    /// Send a GET, retrying transport failures with linear backoff.
    /// Non-success statuses return `Error::HttpStatus` immediately.
    fn send(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(Error::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "failed to fetch {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("request attempt {} for {} failed: {}, retrying", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }

    /// Fetch a URL as UTF-8 text
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("fetching {}", url);
        let response = self.send(url)?;
        response
            .text()
            .map_err(|e| Error::DownloadError(format!("failed to read response from {url}: {e}")))
    }

    /// Download a URL to a file, streaming through a temp file and renaming
    /// atomically into place so a failed download never leaves a partial
    /// artifact at the destination
    pub fn download_file(
        &self,
        url: &str,
        dest_path: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<()> {
        info!("downloading {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut response = self.send(url)?;

        if let Some(pb) = progress {
            if let Some(total) = response.content_length() {
                pb.set_length(total);
            }
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| Error::IoError(format!("failed to create {}: {e}", temp_path.display())))?;

        let copied = match stream_to_file(&mut response, &mut file, progress) {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        fs::rename(&temp_path, dest_path).map_err(|e| {
            Error::IoError(format!(
                "failed to move {} to {}: {e}",
                temp_path.display(),
                dest_path.display()
            ))
        })?;

        info!("downloaded {} bytes to {}", copied, dest_path.display());
        Ok(())
    }

    /// Get release info for a tag (or the latest release) from the
    /// artifact-host API
    pub fn get_release(&self, repo: &str, tag: &str) -> Result<ReleaseInfo> {
        let url = if tag == "latest" {
            format!("https://api.github.com/repos/{repo}/releases/latest")
        } else {
            format!("https://api.github.com/repos/{repo}/releases/tags/{tag}")
        };

        let response = match self.send(&url) {
            Ok(response) => response,
            Err(Error::HttpStatus { status: 404, .. }) => {
                return Err(Error::NotFoundError(format!(
                    "release '{tag}' not found for {repo}"
                )));
            }
            Err(Error::HttpStatus { status: 403, url }) => {
                return Err(Error::DownloadError(format!(
                    "HTTP 403 from {url}; set {} to raise the API rate limit",
                    crate::context::TOKEN_ENV
                )));
            }
            Err(e) => return Err(e),
        };

        response
            .json()
            .map_err(|e| Error::DownloadError(format!("failed to parse release info: {e}")))
    }

    /// Resolve the repository's latest release tag
    pub fn get_latest_version(&self, repo: &str) -> Result<String> {
        Ok(self.get_release(repo, "latest")?.tag_name)
    }
}

/// Stream a response body to a file in bounded chunks, never buffering the
/// whole body in memory
fn stream_to_file(
    response: &mut reqwest::blocking::Response,
    file: &mut File,
    progress: Option<&ProgressBar>,
) -> Result<u64> {
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let n = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("failed to read response: {e}")))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])
            .map_err(|e| Error::IoError(format!("failed to write download: {e}")))?;
        downloaded += n as u64;

        if let Some(pb) = progress {
            pb.set_position(downloaded);
        }
    }

    Ok(downloaded)
}
