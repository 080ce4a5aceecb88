// gallery-core/src/install/model.rs
use std::path::Path;

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{config_file_name, GallerySource, InstalledConfig, InstalledRecord};
use gallery_common::{GalleryModel, InstallRequest};
use gallery_net::{download_file, fetch_bytes, verify_checksum};
use reqwest::Client;
use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, info, instrument};

use super::merge::{deep_merge, merge_overrides};
use super::scan::scan_artifact;
use super::{ensure_not_taken, safe_join, write_atomic, write_record, InstallContext};
use crate::catalog::{available_models, find_gallery_element, normalize_name, LookupPolicy};

/// Downloads a gallery config document (`name`, `urls`, `config_file`,
/// `files`, ...).
pub async fn fetch_gallery_config(client: &Client, url: &str) -> Result<InstalledConfig> {
    let bytes = fetch_bytes(client, url).await?;
    serde_yaml_ng::from_slice(&bytes)
        .map_err(|e| GalleryError::ParseError(url.to_string(), e.to_string()))
}

/// Resolves `galleries`, locates `name` and installs it into `models_path`.
#[instrument(skip(ctx, galleries, request), fields(model = %name))]
pub async fn install_model_from_gallery(
    ctx: InstallContext<'_>,
    galleries: &[GallerySource],
    models_path: &Path,
    name: &str,
    request: &InstallRequest,
    policy: LookupPolicy,
) -> Result<InstalledConfig> {
    let models = available_models(ctx.client, galleries, models_path).await?;
    let model = find_gallery_element(&models, name, policy)?;
    debug!("Located '{}' in gallery '{}'", model.name, model.gallery.name);
    apply_model(ctx, models_path, model, request).await
}

/// Builds the base config of `model`, merges the request into it and installs.
pub async fn apply_model(
    ctx: InstallContext<'_>,
    models_path: &Path,
    model: &GalleryModel,
    request: &InstallRequest,
) -> Result<InstalledConfig> {
    let mut config = if !model.url.is_empty() {
        let mut config = fetch_gallery_config(ctx.client, &model.url).await?;
        config.description = model.description.clone();
        config.license = model.license.clone();
        config
    } else if let Some(inline) = &model.config_file {
        InstalledConfig {
            name: model.name.clone(),
            description: model.description.clone(),
            license: model.license.clone(),
            config_file: serde_yaml_ng::to_string(inline)?,
            ..Default::default()
        }
    } else {
        return Err(GalleryError::InvalidElement(model.name.clone()));
    };

    config.files.extend(request.additional_files.iter().cloned());
    config.files.extend(model.additional_files.iter().cloned());
    extend_urls(&mut config.urls, &model.urls);
    extend_urls(&mut config.urls, &request.urls);
    if !model.icon.is_empty() {
        config.icon = model.icon.clone();
    }

    let overrides = merge_overrides(&model.overrides, &request.overrides);
    let install_name = normalize_name(request.name.as_deref().unwrap_or(&model.name));
    install_model(ctx, models_path, &install_name, config, &overrides, &model.gallery).await
}

/// Installs straight from a config document URL, bypassing the catalogs.
#[instrument(skip(ctx, request))]
pub async fn install_model_from_config_url(
    ctx: InstallContext<'_>,
    models_path: &Path,
    config_url: &str,
    request: &InstallRequest,
) -> Result<InstalledConfig> {
    let mut config = fetch_gallery_config(ctx.client, config_url).await?;
    config.files.extend(request.additional_files.iter().cloned());
    extend_urls(&mut config.urls, &request.urls);

    let name = match (&request.name, config.name.is_empty()) {
        (Some(name), _) => name.clone(),
        (None, false) => config.name.clone(),
        (None, true) => name_from_url(config_url),
    };
    let source = GallerySource::new("", config_url);
    install_model(
        ctx,
        models_path,
        &normalize_name(&name),
        config,
        &request.overrides,
        &source,
    )
    .await
}

/// Downloads the files of `config` into `base`, writes `<install_name>.yaml`
/// with `overrides` applied and records where it came from.
#[instrument(skip(ctx, config, overrides, gallery), fields(gallery = %gallery.name))]
pub async fn install_model(
    ctx: InstallContext<'_>,
    base: &Path,
    install_name: &str,
    mut config: InstalledConfig,
    overrides: &Mapping,
    gallery: &GallerySource,
) -> Result<InstalledConfig> {
    tokio::fs::create_dir_all(base).await?;
    ensure_not_taken(base, install_name, gallery)?;

    if ctx.enforce_scan {
        if let Some(file) = config.files.iter().find(|f| f.sha256.is_empty()) {
            return Err(GalleryError::IntegrityScan(format!(
                "{} has no checksum and scanning is enforced",
                file.filename
            )));
        }
    }
    for file in &config.files {
        let dest = safe_join(base, &file.filename)?;
        let present = !file.sha256.is_empty()
            && dest.is_file()
            && verify_checksum(&dest, &file.sha256).is_ok();
        if present {
            debug!("{} already present with matching checksum", dest.display());
        } else {
            debug!("Downloading {} to {}", file.uri, dest.display());
            download_file(
                ctx.client,
                &file.uri,
                &dest,
                &file.sha256,
                ctx.progress,
                ctx.cancel,
            )
            .await?;
        }
        if ctx.enforce_scan {
            if let Err(e) = scan_artifact(&dest) {
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(e);
            }
        }
    }

    let mut document = match serde_yaml_ng::from_str::<Value>(&config.config_file)? {
        Value::Null => Mapping::new(),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(GalleryError::Merge(format!(
                "config file of '{install_name}' is not a mapping"
            )))
        }
    };
    deep_merge(&mut document, overrides);
    document.insert(
        Value::String("name".to_string()),
        Value::String(install_name.to_string()),
    );
    let rendered = serde_yaml_ng::to_string(&document)?;
    write_atomic(&base.join(config_file_name(install_name)), rendered.as_bytes())?;

    write_record(
        base,
        &InstalledRecord {
            name: install_name.to_string(),
            gallery: gallery.clone(),
            description: config.description.clone(),
            license: config.license.clone(),
            urls: config.urls.clone(),
            files: config.files.clone(),
        },
    )?;

    config.name = install_name.to_string();
    config.config_file = rendered;
    info!("Installed model '{}' into {}", install_name, base.display());
    Ok(config)
}

fn extend_urls(urls: &mut Vec<String>, extra: &[String]) {
    for url in extra {
        if !urls.contains(url) {
            urls.push(url.clone());
        }
    }
}

fn name_from_url(url: &str) -> String {
    let file = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    let file = file.split(['?', '#']).next().unwrap_or(file);
    file.strip_suffix(".yaml")
        .or_else(|| file.strip_suffix(".yml"))
        .unwrap_or(file)
        .to_string()
}

#[cfg(test)]
mod tests {
    use gallery_net::build_http_client;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn inline_model(name: &str, gallery: &str) -> GalleryModel {
        GalleryModel {
            name: name.to_string(),
            description: "inline".to_string(),
            license: "mit".to_string(),
            config_file: Some(serde_yaml_ng::from_str("backend: llama-cpp\ncontext_size: 512\n").unwrap()),
            overrides: serde_yaml_ng::from_str("context_size: 1024\n").unwrap(),
            gallery: GallerySource::new(gallery, format!("file:///{gallery}.yaml")),
            ..Default::default()
        }
    }

    #[test]
    fn names_from_config_urls() {
        assert_eq!(name_from_url("https://x/models/phi-2.yaml"), "phi-2");
        assert_eq!(name_from_url("https://x/models/phi-2.yml?raw=1"), "phi-2");
        assert_eq!(name_from_url("llama"), "llama");
    }

    #[tokio::test]
    async fn element_without_config_is_invalid() {
        let dir = TempDir::new().unwrap();
        let client = build_http_client().unwrap();
        let model = GalleryModel {
            name: "empty".into(),
            ..Default::default()
        };
        let err = apply_model(
            InstallContext::new(&client),
            dir.path(),
            &model,
            &InstallRequest::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidElement(name) if name == "empty"));
        assert!(!dir.path().join("empty.yaml").exists());
    }

    #[tokio::test]
    async fn inline_config_is_merged_with_request_overrides() {
        let dir = TempDir::new().unwrap();
        let client = build_http_client().unwrap();
        let request = InstallRequest {
            name: Some("my-model".into()),
            overrides: serde_yaml_ng::from_str("threads: 8\n").unwrap(),
            urls: vec!["https://example.com/card".into()],
            ..Default::default()
        };
        let installed = apply_model(
            InstallContext::new(&client),
            dir.path(),
            &inline_model("base", "a"),
            &request,
        )
        .await
        .unwrap();
        assert_eq!(installed.name, "my-model");
        assert_eq!(installed.urls, vec!["https://example.com/card".to_string()]);

        let written: Mapping = serde_yaml_ng::from_str(
            &std::fs::read_to_string(dir.path().join("my-model.yaml")).unwrap(),
        )
        .unwrap();
        let expected: Mapping = serde_yaml_ng::from_str(
            "backend: llama-cpp\ncontext_size: 1024\nthreads: 8\nname: my-model\n",
        )
        .unwrap();
        assert_eq!(written, expected);
        assert!(dir.path().join("._gallery_my-model.yaml").exists());
    }

    #[tokio::test]
    async fn same_name_from_another_gallery_is_refused() {
        let dir = TempDir::new().unwrap();
        let client = build_http_client().unwrap();
        let ctx = InstallContext::new(&client);
        let request = InstallRequest::default();

        apply_model(ctx, dir.path(), &inline_model("foo", "a"), &request)
            .await
            .unwrap();
        // Reinstall from the same gallery overwrites
        apply_model(ctx, dir.path(), &inline_model("foo", "a"), &request)
            .await
            .unwrap();
        let err = apply_model(ctx, dir.path(), &inline_model("foo", "b"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::AlreadyInstalled { ref gallery, .. } if gallery == "a"));
    }

    #[tokio::test]
    async fn enforced_scan_requires_checksums() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("weights.gguf");
        std::fs::write(&source, b"GGUF").unwrap();
        let client = build_http_client().unwrap();
        let ctx = InstallContext {
            enforce_scan: true,
            ..InstallContext::new(&client)
        };
        let request = InstallRequest {
            additional_files: vec![gallery_common::model::File {
                filename: "weights.gguf".into(),
                sha256: String::new(),
                uri: source.to_string_lossy().to_string(),
            }],
            ..Default::default()
        };
        let models = dir.path().join("models");
        let err = apply_model(ctx, &models, &inline_model("foo", "a"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::IntegrityScan(_)));
        assert!(!models.join("foo.yaml").exists());
    }

    #[tokio::test]
    async fn missing_checksum_is_caught_before_any_download() {
        use sha2::{Digest, Sha256};

        let dir = TempDir::new().unwrap();
        let checked = dir.path().join("checked.gguf");
        let unchecked = dir.path().join("unchecked.gguf");
        std::fs::write(&checked, b"GGUF checked").unwrap();
        std::fs::write(&unchecked, b"GGUF unchecked").unwrap();
        let client = build_http_client().unwrap();
        let ctx = InstallContext {
            enforce_scan: true,
            ..InstallContext::new(&client)
        };
        let request = InstallRequest {
            additional_files: vec![
                gallery_common::model::File {
                    filename: "checked.gguf".into(),
                    sha256: hex::encode(Sha256::digest(b"GGUF checked")),
                    uri: checked.to_string_lossy().to_string(),
                },
                gallery_common::model::File {
                    filename: "unchecked.gguf".into(),
                    sha256: String::new(),
                    uri: unchecked.to_string_lossy().to_string(),
                },
            ],
            ..Default::default()
        };
        let models = dir.path().join("models");
        let err = apply_model(ctx, &models, &inline_model("foo", "a"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::IntegrityScan(ref msg) if msg.contains("unchecked.gguf")));
        assert!(!models.join("checked.gguf").exists());
    }
}
