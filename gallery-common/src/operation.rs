// gallery-common/src/operation.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Mapping;

use crate::error::GalleryError;
use crate::model::{File, GallerySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Install,
    Delete,
}

/// Which kind of catalog element an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpTarget {
    #[default]
    Model,
    Backend,
}

/// Request-level inputs of an install. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Local identity to install under instead of the catalog name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub overrides: Mapping,
    #[serde(default, rename = "files")]
    pub additional_files: Vec<File>,
    /// Appended to the installed config's URL list.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Install straight from a config document instead of a gallery lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_url: Option<String>,
    /// Replaces the configured galleries for this request only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galleries: Option<Vec<GallerySource>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryOp {
    pub id: String,
    pub kind: OpKind,
    pub target: OpTarget,
    /// Catalog name for installs, installed artifact name for deletes.
    pub target_id: String,
    pub request: InstallRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpState {
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl OpState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OpState::Processing)
    }
}

pub const PROCESSING_MESSAGE: &str = "Processing gallery operation";
pub const COMPLETED_MESSAGE: &str = "Gallery operation completed successfully";
pub const FAILED_MESSAGE: &str = "Failed to process gallery operation";
pub const CANCELLED_MESSAGE: &str = "Gallery operation cancelled";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpStatus {
    #[serde(rename = "status")]
    pub state: OpState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download progress in percent, only meaningful while processing.
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OpStatus {
    pub fn processing() -> Self {
        Self {
            state: OpState::Processing,
            message: PROCESSING_MESSAGE.to_string(),
            error: None,
            progress: 0.0,
            file_name: None,
            updated_at: Utc::now(),
        }
    }

    pub fn completed() -> Self {
        Self {
            state: OpState::Completed,
            message: COMPLETED_MESSAGE.to_string(),
            error: None,
            progress: 100.0,
            file_name: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(error: &GalleryError) -> Self {
        Self::failed_with_message(error.to_string())
    }

    pub fn failed_with_message(error: String) -> Self {
        Self {
            state: OpState::Error,
            message: FAILED_MESSAGE.to_string(),
            error: Some(error),
            progress: 0.0,
            file_name: None,
            updated_at: Utc::now(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            state: OpState::Cancelled,
            message: CANCELLED_MESSAGE.to_string(),
            error: None,
            progress: 0.0,
            file_name: None,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_state_under_status_key() {
        let json = serde_json::to_value(OpStatus::processing()).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["message"], PROCESSING_MESSAGE);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_status_keeps_error_verbatim() {
        let err = GalleryError::NotInstalled("phi-2".into());
        let status = OpStatus::failed(&err);
        assert_eq!(status.state, OpState::Error);
        assert_eq!(status.error.as_deref(), Some("'phi-2' is not installed"));
    }

    #[test]
    fn only_processing_is_non_terminal() {
        assert!(!OpState::Processing.is_terminal());
        assert!(OpState::Completed.is_terminal());
        assert!(OpState::Error.is_terminal());
        assert!(OpState::Cancelled.is_terminal());
    }
}
