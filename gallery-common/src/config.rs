// gallery-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use super::error::{GalleryError, Result};
use crate::model::GallerySource;

// Used when neither GALLERY_ROOT nor a project data directory is available.
const DEFAULT_FALLBACK_ROOT: &str = "./gallery-data";
const DEFAULT_MODEL_GALLERY_NAME: &str = "localai";
const DEFAULT_MODEL_GALLERY_URL: &str =
    "https://raw.githubusercontent.com/mudler/LocalAI/master/gallery/index.yaml";
const DEFAULT_BACKEND_GALLERY_NAME: &str = "localai";
const DEFAULT_BACKEND_GALLERY_URL: &str =
    "https://raw.githubusercontent.com/mudler/LocalAI/master/backend/index.yaml";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_STATUS_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub models_path: PathBuf,
    pub backends_path: PathBuf,
    pub galleries: Vec<GallerySource>,
    pub backend_galleries: Vec<GallerySource>,
    /// Require every downloaded artifact to carry and match a checksum.
    pub enforce_scan: bool,
    /// Reject unqualified names that match elements from several galleries.
    pub strict_lookup: bool,
    /// How long terminal operation statuses are kept. `None` keeps them forever.
    pub status_retention: Option<Duration>,
    /// Prefix for status URLs handed back to API callers.
    pub api_base_url: String,
}

/// Optional on-disk layer, every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    root: Option<PathBuf>,
    models_path: Option<PathBuf>,
    backends_path: Option<PathBuf>,
    galleries: Option<Vec<GallerySource>>,
    backend_galleries: Option<Vec<GallerySource>>,
    enforce_scan: Option<bool>,
    strict_lookup: Option<bool>,
    status_ttl: Option<String>,
    api_base_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading gallery configuration");
        let config_path = env::var("GALLERY_CONFIG")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load_from(config_path.as_deref(), |key| env::var(key).ok())
    }

    /// Builds the configuration from an optional YAML file, then applies
    /// overrides looked up through `env`.
    pub fn load_from<F>(config_path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_config = match config_path {
            Some(path) if path.is_file() => {
                debug!("Reading configuration file: {}", path.display());
                let content = std::fs::read_to_string(path)?;
                serde_yaml_ng::from_str::<FileConfig>(&content).map_err(|e| {
                    GalleryError::Config(format!(
                        "Failed to parse configuration file {}: {e}",
                        path.display()
                    ))
                })?
            }
            _ => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|s| !s.is_empty());

        let root = env("GALLERY_ROOT")
            .map(PathBuf::from)
            .or(file_config.root)
            .or_else(default_data_dir)
            .unwrap_or_else(|| {
                debug!(
                    "No data directory available, falling back to default: {}",
                    DEFAULT_FALLBACK_ROOT
                );
                PathBuf::from(DEFAULT_FALLBACK_ROOT)
            });
        debug!("Effective gallery root set to: {}", root.display());

        let models_path = env("GALLERY_MODELS_PATH")
            .map(PathBuf::from)
            .or(file_config.models_path)
            .unwrap_or_else(|| root.join("models"));
        let backends_path = env("GALLERY_BACKENDS_PATH")
            .map(PathBuf::from)
            .or(file_config.backends_path)
            .unwrap_or_else(|| root.join("backends"));

        let galleries = match env("GALLERY_GALLERIES") {
            Some(raw) => parse_galleries("GALLERY_GALLERIES", &raw)?,
            None => file_config.galleries.unwrap_or_else(|| {
                vec![GallerySource::new(
                    DEFAULT_MODEL_GALLERY_NAME,
                    DEFAULT_MODEL_GALLERY_URL,
                )]
            }),
        };
        let backend_galleries = match env("GALLERY_BACKEND_GALLERIES") {
            Some(raw) => parse_galleries("GALLERY_BACKEND_GALLERIES", &raw)?,
            None => file_config.backend_galleries.unwrap_or_else(|| {
                vec![GallerySource::new(
                    DEFAULT_BACKEND_GALLERY_NAME,
                    DEFAULT_BACKEND_GALLERY_URL,
                )]
            }),
        };

        let enforce_scan = match env("GALLERY_ENFORCE_SCAN") {
            Some(raw) => parse_bool("GALLERY_ENFORCE_SCAN", &raw)?,
            None => file_config.enforce_scan.unwrap_or(false),
        };
        let strict_lookup = match env("GALLERY_STRICT_LOOKUP") {
            Some(raw) => parse_bool("GALLERY_STRICT_LOOKUP", &raw)?,
            None => file_config.strict_lookup.unwrap_or(false),
        };
        let status_retention = match env("GALLERY_STATUS_TTL").or(file_config.status_ttl) {
            Some(raw) => parse_retention(&raw)?,
            None => Some(DEFAULT_STATUS_RETENTION),
        };
        let api_base_url = env("GALLERY_API_BASE_URL")
            .or(file_config.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        debug!("Configuration loaded successfully.");
        Ok(Self {
            root,
            models_path,
            backends_path,
            galleries,
            backend_galleries,
            enforce_scan,
            strict_lookup,
            status_retention,
            api_base_url,
        })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// File backing the statically configured backend list.
    pub fn backend_registry_path(&self) -> PathBuf {
        self.root.join("static_backends.yaml")
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "gallery", "gallery").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("io", "gallery", "gallery").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Parses a JSON list of `{url, name}` objects.
pub fn parse_galleries(key: &str, raw: &str) -> Result<Vec<GallerySource>> {
    serde_json::from_str(raw)
        .map_err(|e| GalleryError::Config(format!("{key} must be a JSON list of {{url, name}}: {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GalleryError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_retention(raw: &str) -> Result<Option<Duration>> {
    match raw.trim() {
        "never" | "off" | "0" => Ok(None),
        value => humantime::parse_duration(value)
            .map(Some)
            .map_err(|e| GalleryError::Config(format!("Invalid status TTL '{value}': {e}"))),
    }
}
