// gallery-core/src/install/backend.rs
use std::path::Path;

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{config_file_name, File, GallerySource, InstalledRecord};
use gallery_common::{GalleryBackend, InstallRequest};
use gallery_net::{download_file, resolve_uri};
use tracing::{info, instrument};

use super::scan::scan_artifact;
use super::{ensure_not_taken, safe_join, write_atomic, write_record, InstallContext};
use crate::catalog::{available_backends, find_gallery_element, normalize_name, LookupPolicy};

const DEFAULT_ARTIFACT_NAME: &str = "backend";

#[instrument(skip(ctx, galleries, request), fields(backend = %name))]
pub async fn install_backend_from_gallery(
    ctx: InstallContext<'_>,
    galleries: &[GallerySource],
    backends_path: &Path,
    name: &str,
    request: &InstallRequest,
    policy: LookupPolicy,
) -> Result<GalleryBackend> {
    let backends = available_backends(ctx.client, galleries, backends_path).await?;
    let backend = find_gallery_element(&backends, name, policy)?;
    let install_name = normalize_name(request.name.as_deref().unwrap_or(&backend.name));
    install_backend(ctx, backends_path, backend, &install_name).await
}

/// Downloads the backend artifact into `<base>/<install_name>/` and writes
/// `<base>/<install_name>.yaml`.
pub async fn install_backend(
    ctx: InstallContext<'_>,
    base: &Path,
    backend: &GalleryBackend,
    install_name: &str,
) -> Result<GalleryBackend> {
    if backend.uri.is_empty() {
        return Err(GalleryError::InvalidElement(backend.name.clone()));
    }
    if ctx.enforce_scan && backend.sha256.is_empty() {
        return Err(GalleryError::IntegrityScan(format!(
            "backend {} has no checksum and scanning is enforced",
            backend.name
        )));
    }
    tokio::fs::create_dir_all(base).await?;
    ensure_not_taken(base, install_name, &backend.gallery)?;

    let artifact = artifact_name(&backend.uri);
    let relative = format!("{install_name}/{artifact}");
    let dest = safe_join(base, &relative)?;
    download_file(
        ctx.client,
        &backend.uri,
        &dest,
        &backend.sha256,
        ctx.progress,
        ctx.cancel,
    )
    .await?;
    if ctx.enforce_scan {
        if let Err(e) = scan_artifact(&dest) {
            let _ = tokio::fs::remove_dir_all(base.join(install_name)).await;
            return Err(e);
        }
    }

    let installed = GalleryBackend {
        name: install_name.to_string(),
        installed: true,
        ..backend.clone()
    };
    let rendered = serde_yaml_ng::to_string(&installed)?;
    write_atomic(&base.join(config_file_name(install_name)), rendered.as_bytes())?;
    write_record(
        base,
        &InstalledRecord {
            name: install_name.to_string(),
            gallery: backend.gallery.clone(),
            description: backend.description.clone(),
            license: backend.license.clone(),
            urls: backend.urls.clone(),
            files: vec![File {
                filename: relative,
                sha256: backend.sha256.clone(),
                uri: backend.uri.clone(),
            }],
        },
    )?;
    info!("Installed backend '{}' into {}", install_name, base.display());
    Ok(installed)
}

/// Last path segment of the resolved URI, without query or fragment.
fn artifact_name(uri: &str) -> String {
    let resolved = resolve_uri(uri);
    let trimmed = resolved.split(['?', '#']).next().unwrap_or(&resolved);
    match trimmed.trim_end_matches('/').rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() && name != ".." && !name.contains(':') => name.to_string(),
        _ => DEFAULT_ARTIFACT_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use gallery_net::build_http_client;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn artifact_names() {
        assert_eq!(artifact_name("https://x/b/llama-cpp.tar?x=1"), "llama-cpp.tar");
        assert_eq!(artifact_name("/opt/backends/whisper"), "whisper");
        assert_eq!(artifact_name("https:"), DEFAULT_ARTIFACT_NAME);
    }

    #[tokio::test]
    async fn backend_lands_in_its_own_directory() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("runner.bin");
        std::fs::write(&source, b"#!/bin/sh\n").unwrap();
        let client = build_http_client().unwrap();
        let backend = GalleryBackend {
            name: "cpu-runner".into(),
            uri: source.to_string_lossy().to_string(),
            gallery: GallerySource::new("main", "file:///main.yaml"),
            ..Default::default()
        };
        let base = dir.path().join("backends");
        let installed = install_backend(InstallContext::new(&client), &base, &backend, "cpu-runner")
            .await
            .unwrap();
        assert!(installed.installed);
        assert!(base.join("cpu-runner").join("runner.bin").is_file());
        assert!(base.join("cpu-runner.yaml").is_file());
        assert!(base.join("._gallery_cpu-runner.yaml").is_file());
    }

    #[tokio::test]
    async fn backend_without_uri_is_invalid() {
        let dir = TempDir::new().unwrap();
        let client = build_http_client().unwrap();
        let backend = GalleryBackend {
            name: "nothing".into(),
            ..Default::default()
        };
        let err = install_backend(InstallContext::new(&client), dir.path(), &backend, "nothing")
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidElement(_)));
    }
}
