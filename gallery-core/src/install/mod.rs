// gallery-core/src/install/mod.rs
//! Materializes catalog elements on disk: downloads their files, merges the
//! config document with request overrides and writes the installed config.

pub mod backend;
pub mod merge;
pub mod model;
pub mod scan;

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::AtomicBool;

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{GallerySource, InstalledRecord};
use gallery_net::DownloadStatusFn;
use reqwest::Client;
use tracing::debug;

pub use backend::{install_backend, install_backend_from_gallery};
pub use merge::{deep_merge, merge_overrides};
pub use model::{
    apply_model, fetch_gallery_config, install_model, install_model_from_config_url,
    install_model_from_gallery,
};
pub use scan::scan_artifact;

/// Everything an install needs besides the element itself.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    pub client: &'a Client,
    pub progress: Option<&'a DownloadStatusFn>,
    pub cancel: Option<&'a AtomicBool>,
    /// Require a checksum for every file and scan downloaded artifacts.
    pub enforce_scan: bool,
}

impl<'a> InstallContext<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            progress: None,
            cancel: None,
            enforce_scan: false,
        }
    }
}

/// Joins a catalog-supplied relative path onto `base`, refusing anything that
/// would land outside of it.
pub(crate) fn safe_join(base: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative);
    let escapes = relative.is_empty()
        || candidate.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(GalleryError::PathTraversal(relative.to_string()));
    }
    Ok(base.join(candidate))
}

/// Writes `content` to a temporary file beside `path` and renames it into place.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| {
        GalleryError::IoError(format!("Failed to persist {}: {}", path.display(), e.error))
    })?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub(crate) fn read_record(base: &Path, install_name: &str) -> Result<Option<InstalledRecord>> {
    let path = base.join(InstalledRecord::file_name(install_name));
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let record = serde_yaml_ng::from_str(&content).map_err(|e| {
        GalleryError::ParseError(path.display().to_string(), e.to_string())
    })?;
    Ok(Some(record))
}

pub(crate) fn write_record(base: &Path, record: &InstalledRecord) -> Result<()> {
    let content = serde_yaml_ng::to_string(record)?;
    write_atomic(
        &base.join(InstalledRecord::file_name(&record.name)),
        content.as_bytes(),
    )
}

/// Fails when `install_name` is already taken by an install from another
/// gallery. Reinstalling from the same gallery is allowed.
pub(crate) fn ensure_not_taken(
    base: &Path,
    install_name: &str,
    gallery: &GallerySource,
) -> Result<()> {
    if let Some(existing) = read_record(base, install_name)? {
        if existing.gallery != *gallery {
            return Err(GalleryError::AlreadyInstalled {
                name: install_name.to_string(),
                gallery: existing.gallery.name,
            });
        }
        debug!(
            "'{}' already installed from '{}', overwriting",
            install_name, gallery.name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn safe_join_rejects_escaping_paths() {
        let base = Path::new("/models");
        assert_eq!(
            safe_join(base, "sub/weights.gguf").unwrap(),
            PathBuf::from("/models/sub/weights.gguf")
        );
        for bad in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(safe_join(base, bad), Err(GalleryError::PathTraversal(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn install_name_taken_by_other_gallery() {
        let dir = TempDir::new().unwrap();
        let first = GallerySource::new("first", "https://first.example.com/index.yaml");
        let second = GallerySource::new("second", "https://second.example.com/index.yaml");
        write_record(
            dir.path(),
            &InstalledRecord {
                name: "foo".into(),
                gallery: first.clone(),
                ..Default::default()
            },
        )
        .unwrap();

        ensure_not_taken(dir.path(), "foo", &first).unwrap();
        ensure_not_taken(dir.path(), "bar", &second).unwrap();
        let err = ensure_not_taken(dir.path(), "foo", &second).unwrap_err();
        assert!(matches!(err, GalleryError::AlreadyInstalled { .. }));
    }
}
