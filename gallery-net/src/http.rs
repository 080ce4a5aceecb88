// gallery-net/src/http.rs
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use gallery_common::error::{GalleryError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};
use url::Url;

use crate::validation::validate_uri;

const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "gallery artifact manager (Rust)";
const GITHUB_RAW_HOST: &str = "https://raw.githubusercontent.com";
const GITHUB_DEFAULT_BRANCH: &str = "main";
pub(crate) const GITHUB_PREFIX: &str = "github:";

/// Progress sink: `(url, file_name, status, percent)`. Purely a notification;
/// no call is guaranteed.
pub type DownloadStatusFn = dyn Fn(&str, &str, &str, f64) + Send + Sync;

enum Location {
    Remote(String),
    Local(PathBuf),
}

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| GalleryError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Expands `github:owner/repo/path[@branch]` to its raw content URL; any other
/// URI is returned unchanged.
pub fn resolve_uri(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix(GITHUB_PREFIX) else {
        return uri.to_string();
    };
    let (path, branch) = match rest.rsplit_once('@') {
        Some((path, branch)) if !branch.is_empty() => (path, branch),
        _ => (rest, GITHUB_DEFAULT_BRANCH),
    };
    let mut parts = path.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), Some(file)) => {
            format!("{GITHUB_RAW_HOST}/{owner}/{repo}/{branch}/{file}")
        }
        _ => uri.to_string(),
    }
}

fn locate(uri: &str) -> Result<Location> {
    validate_uri(uri)?;
    let resolved = resolve_uri(uri);
    match Url::parse(&resolved) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().map(Location::Local).map_err(|_| {
            GalleryError::ValidationError(format!("Invalid file URL '{resolved}'"))
        }),
        Ok(_) => Ok(Location::Remote(resolved)),
        Err(_) => Ok(Location::Local(PathBuf::from(resolved))),
    }
}

/// Downloads the whole document behind `uri` into memory.
pub async fn fetch_bytes(client: &Client, uri: &str) -> Result<Vec<u8>> {
    match locate(uri)? {
        Location::Local(path) => {
            debug!("Reading local document: {}", path.display());
            tokio::fs::read(&path).await.map_err(|e| {
                GalleryError::DownloadError(
                    path.display().to_string(),
                    uri.to_string(),
                    e.to_string(),
                )
            })
        }
        Location::Remote(url) => {
            debug!("Fetching remote document: {}", url);
            let response = client.get(&url).send().await.map_err(|e| {
                debug!("HTTP request failed for {url}: {e}");
                GalleryError::HttpError(format!("HTTP request failed for {url}: {e}"))
            })?;
            let response = check_status(response, &url, &url).await?;
            let bytes = response.bytes().await.map_err(|e| {
                GalleryError::HttpError(format!("Failed to read response body bytes: {e}"))
            })?;
            Ok(bytes.to_vec())
        }
    }
}

async fn check_status(
    response: reqwest::Response,
    url: &str,
    what: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    if status.is_success() {
        return Ok(response);
    }
    let body_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read response body".to_string());
    error!("HTTP error {} for URL {}: {}", status, url, body_text);
    match status {
        StatusCode::NOT_FOUND => Err(GalleryError::DownloadError(
            what.to_string(),
            url.to_string(),
            "Resource not found (404)".to_string(),
        )),
        StatusCode::FORBIDDEN => Err(GalleryError::DownloadError(
            what.to_string(),
            url.to_string(),
            "Access forbidden (403)".to_string(),
        )),
        _ => Err(GalleryError::HttpError(format!(
            "HTTP error {status} for URL {url}: {body_text}"
        ))),
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GiB", b / GB)
    } else if b >= MB {
        format!("{:.1} MiB", b / MB)
    } else if b >= KB {
        format!("{:.1} KiB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Downloads `uri` to `dest` through a temporary file, verifying `sha256`
/// when it is non-empty. The cancel flag is checked between chunks.
pub async fn download_file(
    client: &Client,
    uri: &str,
    dest: &Path,
    sha256_expected: &str,
    progress: Option<&DownloadStatusFn>,
    cancel: Option<&AtomicBool>,
) -> Result<PathBuf> {
    let file_name = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = dest.with_file_name(format!(".{file_name}.download"));
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            GalleryError::IoError(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    if temp_path.exists() {
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }
    debug!("Downloading {} to temporary path: {}", uri, temp_path.display());

    let result = stream_to_file(client, uri, &temp_path, &file_name, progress, cancel).await;
    let actual = match result {
        Ok(actual) => actual,
        Err(e) => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
    };

    if !sha256_expected.is_empty() {
        if !actual.eq_ignore_ascii_case(sha256_expected) {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(GalleryError::ChecksumMismatch(format!(
                "Checksum mismatch for {}: expected {}, got {}",
                file_name, sha256_expected, actual
            )));
        }
        debug!("Checksum verified for {}", file_name);
    } else {
        tracing::warn!(
            "Skipping checksum verification for {} - none provided.",
            file_name
        );
    }

    tokio::fs::rename(&temp_path, dest).await.map_err(|e| {
        GalleryError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            dest.display(),
            e
        ))
    })?;
    debug!("Moved verified file to final location: {}", dest.display());
    Ok(dest.to_path_buf())
}

/// Writes the body behind `uri` to `temp_path`, returning its hex SHA-256.
async fn stream_to_file(
    client: &Client,
    uri: &str,
    temp_path: &Path,
    file_name: &str,
    progress: Option<&DownloadStatusFn>,
    cancel: Option<&AtomicBool>,
) -> Result<String> {
    if is_cancelled(cancel) {
        return Err(GalleryError::Cancelled);
    }
    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        GalleryError::IoError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    let mut hasher = Sha256::new();

    match locate(uri)? {
        Location::Local(path) => {
            let content = tokio::fs::read(&path).await.map_err(|e| {
                GalleryError::DownloadError(file_name.to_string(), uri.to_string(), e.to_string())
            })?;
            hasher.update(&content);
            temp_file.write_all(&content).await?;
            if let Some(report) = progress {
                let size = format_size(content.len() as u64);
                report(uri, file_name, &format!("{size}/{size}"), 100.0);
            }
        }
        Location::Remote(url) => {
            let response = client.get(&url).send().await.map_err(|e| {
                GalleryError::HttpError(format!("HTTP request failed for {url}: {e}"))
            })?;
            let response = check_status(response, &url, file_name).await?;
            let total = response.content_length().unwrap_or(0);
            let mut written: u64 = 0;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                if is_cancelled(cancel) {
                    debug!("Download of {} cancelled after {} bytes", url, written);
                    return Err(GalleryError::Cancelled);
                }
                let chunk = chunk.map_err(|e| {
                    GalleryError::HttpError(format!("Failed to read response body bytes: {e}"))
                })?;
                hasher.update(&chunk);
                temp_file.write_all(&chunk).await.map_err(|e| {
                    GalleryError::IoError(format!(
                        "Failed to write download stream to {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;
                written += chunk.len() as u64;
                if let Some(report) = progress {
                    let percent = if total > 0 {
                        written as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    };
                    let status = format!("{}/{}", format_size(written), format_size(total));
                    report(&url, file_name, &status, percent);
                }
            }
        }
    }

    temp_file.flush().await?;
    drop(temp_file);
    Ok(hex::encode(hasher.finalize()))
}
