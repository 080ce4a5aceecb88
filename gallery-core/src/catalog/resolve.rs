// gallery-core/src/catalog/resolve.rs
use std::path::Path;

use gallery_common::error::Result;
use gallery_common::model::{config_file_name, GalleryElement, GallerySource};
use gallery_common::{GalleryBackend, GalleryModel};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::fetch::fetch_gallery_elements;
use super::locate::normalize_name;

/// True when `<base_path>/<name>.yaml` exists.
pub fn is_installed(base_path: &Path, name: &str) -> bool {
    base_path
        .join(config_file_name(&normalize_name(name)))
        .is_file()
}

/// Fetches every gallery in order and concatenates their elements, tagging
/// each with its gallery and installed state. Any failing gallery fails the
/// whole resolution.
#[instrument(skip(client, galleries), fields(galleries = galleries.len()))]
pub async fn available_elements<T>(
    client: &Client,
    galleries: &[GallerySource],
    base_path: &Path,
) -> Result<Vec<T>>
where
    T: GalleryElement + DeserializeOwned,
{
    let mut all = Vec::new();
    for gallery in galleries {
        let mut elements: Vec<T> = fetch_gallery_elements(client, gallery).await?;
        for element in &mut elements {
            element.set_gallery(gallery.clone());
            if is_installed(base_path, element.name()) {
                element.set_installed(true);
            }
        }
        debug!(
            "Fetched {} elements from gallery '{}'",
            elements.len(),
            gallery.name
        );
        all.extend(elements);
    }
    Ok(all)
}

pub async fn available_models(
    client: &Client,
    galleries: &[GallerySource],
    models_path: &Path,
) -> Result<Vec<GalleryModel>> {
    available_elements(client, galleries, models_path).await
}

pub async fn available_backends(
    client: &Client,
    galleries: &[GallerySource],
    backends_path: &Path,
) -> Result<Vec<GalleryBackend>> {
    available_elements(client, galleries, backends_path).await
}
