// gallery-common/src/model/installed.rs
use serde::{Deserialize, Serialize};

use super::GallerySource;

/// Extension of the per-artifact config file whose presence marks an install.
pub const CONFIG_EXTENSION: &str = "yaml";

/// `<name>.yaml`
pub fn config_file_name(name: &str) -> String {
    format!("{name}.{CONFIG_EXTENSION}")
}

/// A file to download next to an installed artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub filename: String,
    #[serde(default)]
    pub sha256: String,
    pub uri: String,
}

/// The materialized definition of an artifact, built from a catalog element
/// plus request-level overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Config document (YAML text) written as `<name>.yaml` on install.
    #[serde(default)]
    pub config_file: String,
    #[serde(default)]
    pub files: Vec<File>,
}

/// Written beside an installed config as `._gallery_<name>.yaml`; records
/// where the artifact came from and which files belong to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub name: String,
    #[serde(default)]
    pub gallery: GallerySource,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub files: Vec<File>,
}

impl InstalledRecord {
    pub const FILE_PREFIX: &'static str = "._gallery_";

    pub fn file_name(install_name: &str) -> String {
        format!("{}{}", Self::FILE_PREFIX, config_file_name(install_name))
    }
}
