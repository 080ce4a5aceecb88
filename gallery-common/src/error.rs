use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GalleryError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("YAML Parsing Error: {0}")]
    Yaml(#[from] Arc<serde_yaml_ng::Error>),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(String, String),

    #[error("invalid reference file at url {0}: {1}")]
    InvalidReference(String, String),

    #[error("{0}")]
    NotFound(String),

    #[error("ambiguous name '{name}' matches elements from galleries {galleries:?}; qualify it as <gallery>@{name}")]
    Ambiguous {
        name: String,
        galleries: Vec<String>,
    },

    #[error("invalid gallery element {0}: it has neither a config url nor an inline config file")]
    InvalidElement(String),

    #[error("Merge Error: {0}")]
    Merge(String),

    #[error("'{name}' is already installed from gallery '{gallery}'; install it under a different name")]
    AlreadyInstalled { name: String, gallery: String },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("'{0}' is not installed")]
    NotInstalled(String),

    #[error("path '{0}' escapes the installation directory")]
    PathTraversal(String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Integrity scan failed: {0}")]
    IntegrityScan(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl GalleryError {
    /// True when the artifact was reachable but failed verification.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            GalleryError::ChecksumMismatch(_) | GalleryError::IntegrityScan(_)
        )
    }
}

impl From<std::io::Error> for GalleryError {
    fn from(err: std::io::Error) -> Self {
        GalleryError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for GalleryError {
    fn from(err: reqwest::Error) -> Self {
        GalleryError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(err: serde_json::Error) -> Self {
        GalleryError::Json(Arc::new(err))
    }
}

impl From<serde_yaml_ng::Error> for GalleryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        GalleryError::Yaml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_errors_are_distinct_from_network_errors() {
        assert!(GalleryError::ChecksumMismatch("x".into()).is_integrity_error());
        assert!(GalleryError::IntegrityScan("x".into()).is_integrity_error());
        assert!(!GalleryError::HttpError("timeout".into()).is_integrity_error());
        assert!(!GalleryError::DownloadError("a".into(), "b".into(), "c".into())
            .is_integrity_error());
    }

    #[test]
    fn not_found_message_is_verbatim() {
        let err = GalleryError::NotFound("no element found with name \"llama\"".into());
        assert_eq!(err.to_string(), "no element found with name \"llama\"");
    }
}
