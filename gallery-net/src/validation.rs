// gallery-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use gallery_common::error::{GalleryError, Result};
use sha2::{Digest, Sha256};
use url::Url;

use crate::http::GITHUB_PREFIX;

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256: {} ({} bytes read)",
        actual,
        bytes_copied
    );
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(GalleryError::ChecksumMismatch(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Accepts http(s) and file URLs, `github:` shorthands and bare paths.
pub fn validate_uri(uri: &str) -> Result<()> {
    if uri.trim().is_empty() {
        return Err(GalleryError::ValidationError("empty URI".to_string()));
    }
    if uri.starts_with(GITHUB_PREFIX) {
        return Ok(());
    }
    match Url::parse(uri) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "file" => Ok(()),
            other => Err(GalleryError::ValidationError(format!(
                "Invalid URL scheme for '{uri}': must be http, https or file, but got '{other}'"
            ))),
        },
        // Relative or absolute filesystem path
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(e) => Err(GalleryError::ValidationError(format!(
            "Failed to parse URL '{uri}': {e}"
        ))),
    }
}
