// gallery-core/src/registry.rs
//! Statically configured backends, managed directly rather than through the
//! operation queue.

use std::path::{Path, PathBuf};

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::BackendEntry;
use tracing::debug;

use crate::install::write_atomic;

#[derive(Debug, Default)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
    path: Option<PathBuf>,
}

impl BackendRegistry {
    /// An in-memory registry that is never persisted.
    pub fn new(entries: Vec<BackendEntry>) -> Self {
        Self {
            entries,
            path: None,
        }
    }

    /// Loads the registry from `path`; a missing file yields an empty registry
    /// that will be written there on the first change.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let entries = if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            let entries: Option<Vec<BackendEntry>> = serde_yaml_ng::from_str(&content)
                .map_err(|e| GalleryError::ParseError(path.display().to_string(), e.to_string()))?;
            entries.unwrap_or_default()
        } else {
            Vec::new()
        };
        debug!(
            "Loaded {} static backends from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn list(&self) -> &[BackendEntry] {
        &self.entries
    }

    pub fn add(&mut self, entry: BackendEntry) -> Result<()> {
        if self.entries.iter().any(|e| e.name == entry.name) {
            return Err(GalleryError::AlreadyExists(entry.name));
        }
        debug!("Registering backend '{}'", entry.name);
        let mut entries = self.entries.clone();
        entries.push(entry);
        self.persist(&entries)?;
        self.entries = entries;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<BackendEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| GalleryError::NotFound(format!("{name} is not currently registered")))?;
        let mut entries = self.entries.clone();
        let removed = entries.remove(index);
        self.persist(&entries)?;
        self.entries = entries;
        debug!("Unregistered backend '{}'", removed.name);
        Ok(removed)
    }

    /// Writes the registry back to its file, if it has one.
    pub fn save(&self) -> Result<()> {
        self.persist(&self.entries)
    }

    fn persist(&self, entries: &[BackendEntry]) -> Result<()> {
        match &self.path {
            Some(path) => {
                let content = serde_yaml_ng::to_string(entries)?;
                write_atomic(path, content.as_bytes())
            }
            None => Ok(()),
        }
    }
}
