// gallery-common/src/model/backend.rs
use serde::{Deserialize, Serialize};

use super::{GalleryElement, GallerySource};

/// A backend entry as published in a backend gallery manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryBackend {
    pub name: String,
    /// Artifact to download when installing the backend.
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha256: String,

    #[serde(default, skip_deserializing)]
    pub gallery: GallerySource,
    #[serde(default, skip_deserializing)]
    pub installed: bool,
}

impl GalleryElement for GalleryBackend {
    fn set_gallery(&mut self, gallery: GallerySource) {
        self.gallery = gallery;
    }

    fn set_installed(&mut self, installed: bool) {
        self.installed = installed;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn gallery(&self) -> &GallerySource {
        &self.gallery
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Statically configured backend, managed outside the operation queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEntry {
    pub name: String,
    #[serde(default, rename = "type")]
    pub backend_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
