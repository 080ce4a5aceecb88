// gallery-core/src/uninstall.rs
//! Removal of installed models and backends.

use std::collections::HashSet;
use std::path::Path;
use std::{fs, io};

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{config_file_name, InstalledRecord};
use tracing::{debug, info, warn};

use crate::catalog::normalize_name;
use crate::install::{read_record, safe_join};

/// Removes a file or directory. Returns `true` if it is gone afterwards.
pub(crate) fn remove_filesystem_artifact(path: &Path) -> bool {
    match path.symlink_metadata() {
        Ok(metadata) => {
            let is_real_dir = metadata.file_type().is_dir();
            debug!(
                "Removing filesystem artifact ({}) at: {}",
                if is_real_dir { "directory" } else { "file" },
                path.display()
            );
            let removed = if is_real_dir {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            match removed {
                Ok(()) => true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => {
                    warn!("Failed to remove artifact {}: {}", path.display(), e);
                    false
                }
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Artifact not found (already removed?): {}", path.display());
            true
        }
        Err(e) => {
            warn!(
                "Failed to get metadata for artifact {}: {}",
                path.display(),
                e
            );
            false
        }
    }
}

/// Files referenced by every install record in `base` except `skip`'s own.
fn files_used_elsewhere(base: &Path, skip: &str) -> Result<HashSet<String>> {
    let own = InstalledRecord::file_name(skip);
    let mut used = HashSet::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.starts_with(InstalledRecord::FILE_PREFIX) || file_name == own {
            continue;
        }
        let content = match fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {}: {}", entry.path().display(), e);
                continue;
            }
        };
        match serde_yaml_ng::from_str::<InstalledRecord>(&content) {
            Ok(record) => used.extend(record.files.into_iter().map(|f| f.filename)),
            Err(e) => warn!("Ignoring unreadable record {}: {}", file_name, e),
        }
    }
    Ok(used)
}

/// Deletes an installed model: its downloaded files (unless another install
/// still references them), its record and its config.
pub fn delete_model_from_system(base: &Path, name: &str) -> Result<()> {
    let name = normalize_name(name);
    let config_path = base.join(config_file_name(&name));
    if !config_path.is_file() {
        return Err(GalleryError::NotInstalled(name));
    }

    if let Some(record) = read_record(base, &name)? {
        let shared = files_used_elsewhere(base, &name)?;
        for file in &record.files {
            if shared.contains(&file.filename) {
                debug!("Keeping {}, still used by another install", file.filename);
                continue;
            }
            match safe_join(base, &file.filename) {
                Ok(path) => {
                    remove_filesystem_artifact(&path);
                }
                Err(e) => warn!("Not removing {}: {}", file.filename, e),
            }
        }
        remove_filesystem_artifact(&base.join(InstalledRecord::file_name(&name)));
    }

    fs::remove_file(&config_path)?;
    info!("Deleted model '{}'", name);
    Ok(())
}

/// Deletes an installed backend directory together with its config and record.
pub fn delete_backend_from_system(base: &Path, name: &str) -> Result<()> {
    let name = normalize_name(name);
    let config_path = base.join(config_file_name(&name));
    if !config_path.is_file() {
        return Err(GalleryError::NotInstalled(name));
    }
    let backend_dir = safe_join(base, &name)?;
    if !remove_filesystem_artifact(&backend_dir) {
        return Err(GalleryError::IoError(format!(
            "Failed to remove backend directory {}",
            backend_dir.display()
        )));
    }
    remove_filesystem_artifact(&base.join(InstalledRecord::file_name(&name)));
    fs::remove_file(&config_path)?;
    info!("Deleted backend '{}'", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use gallery_common::model::File;
    use tempfile::TempDir;

    use super::*;
    use crate::install::write_record;

    fn install_fake(base: &Path, name: &str, files: &[&str]) {
        fs::write(base.join(config_file_name(name)), format!("name: {name}\n")).unwrap();
        for file in files {
            fs::write(base.join(file), b"data").unwrap();
        }
        write_record(
            base,
            &InstalledRecord {
                name: name.to_string(),
                files: files
                    .iter()
                    .map(|f| File {
                        filename: f.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn deleting_missing_model_is_not_installed() {
        let dir = TempDir::new().unwrap();
        let err = delete_model_from_system(dir.path(), "ghost").unwrap_err();
        assert_eq!(err.to_string(), "'ghost' is not installed");
    }

    #[test]
    fn shared_files_survive_delete() {
        let dir = TempDir::new().unwrap();
        install_fake(dir.path(), "a", &["own.bin", "shared.bin"]);
        install_fake(dir.path(), "b", &["shared.bin"]);

        delete_model_from_system(dir.path(), "a").unwrap();
        assert!(!dir.path().join("a.yaml").exists());
        assert!(!dir.path().join("._gallery_a.yaml").exists());
        assert!(!dir.path().join("own.bin").exists());
        assert!(dir.path().join("shared.bin").exists());
        assert!(dir.path().join("b.yaml").exists());
    }

    #[test]
    fn backend_delete_removes_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("cpu")).unwrap();
        fs::write(dir.path().join("cpu").join("run"), b"x").unwrap();
        fs::write(dir.path().join("cpu.yaml"), b"name: cpu\n").unwrap();

        delete_backend_from_system(dir.path(), "cpu").unwrap();
        assert!(!dir.path().join("cpu").exists());
        assert!(!dir.path().join("cpu.yaml").exists());
        assert!(delete_backend_from_system(dir.path(), "cpu").is_err());
    }
}
