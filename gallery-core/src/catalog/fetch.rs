// gallery-core/src/catalog/fetch.rs
use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{GalleryElement, GallerySource};
use gallery_net::{fetch_bytes, resolve_uri};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_yaml_ng::Value;
use tracing::{debug, warn};

/// Gallery URLs with this suffix hold a relative path to the real manifest.
pub const REFERENCE_SUFFIX: &str = ".ref";

/// Reads a reference file and resolves its content against the directory of
/// `url`.
pub async fn resolve_reference_url(client: &Client, url: &str) -> Result<String> {
    let bytes = fetch_bytes(client, url).await?;
    let reference = String::from_utf8(bytes)
        .map_err(|e| GalleryError::InvalidReference(url.to_string(), e.to_string()))?;
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(GalleryError::InvalidReference(
            url.to_string(),
            "reference file is empty".to_string(),
        ));
    }
    let resolved = resolve_uri(url);
    let cut_point = resolved.rfind('/').map_or(0, |i| i + 1);
    let target = format!("{}{}", &resolved[..cut_point], reference);
    debug!("Reference {} points to {}", url, target);
    Ok(target)
}

/// Downloads the manifest of `gallery` and deserializes its elements.
///
/// Items that fail to deserialize are logged and skipped; a document that is
/// not a list at all is an error.
pub async fn fetch_gallery_elements<T>(client: &Client, gallery: &GallerySource) -> Result<Vec<T>>
where
    T: GalleryElement + DeserializeOwned,
{
    let url = if gallery.url.ends_with(REFERENCE_SUFFIX) {
        resolve_reference_url(client, &gallery.url).await?
    } else {
        gallery.url.clone()
    };

    debug!("Fetching gallery '{}' from {}", gallery.name, url);
    let bytes = fetch_bytes(client, &url).await?;
    parse_elements(&bytes, &url)
}

pub(crate) fn parse_elements<T: DeserializeOwned>(bytes: &[u8], source: &str) -> Result<Vec<T>> {
    let document: Value = serde_yaml_ng::from_slice(bytes)?;
    let items = match document {
        Value::Sequence(items) => items,
        Value::Null => Vec::new(),
        _ => {
            return Err(GalleryError::ParseError(
                source.to_string(),
                "gallery manifest must be a list of elements".to_string(),
            ))
        }
    };

    let total = items.len();
    let mut elements = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match serde_yaml_ng::from_value::<T>(item) {
            Ok(element) => elements.push(element),
            Err(e) => warn!("Skipping element #{} of {}: {}", index, source, e),
        }
    }
    if elements.len() != total {
        warn!(
            "Loaded {} of {} elements from {}",
            elements.len(),
            total,
            source
        );
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use gallery_common::GalleryModel;

    use super::*;

    #[test]
    fn malformed_items_are_skipped() {
        let yaml = r#"
- name: good
  url: https://example.com/good.yaml
- name: [not, a, string]
- name: also-good
  urls: [https://example.com]
"#;
        let models: Vec<GalleryModel> = parse_elements(yaml.as_bytes(), "test").unwrap();
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["good", "also-good"]);
    }

    #[test]
    fn non_list_document_is_rejected() {
        let err = parse_elements::<GalleryModel>(b"name: lonely\n", "test").unwrap_err();
        assert!(matches!(err, GalleryError::ParseError(..)));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = parse_elements::<GalleryModel>(b"- name: [unterminated\n", "test").unwrap_err();
        assert!(matches!(err, GalleryError::Yaml(_)));
    }

    #[test]
    fn empty_document_has_no_elements() {
        let models: Vec<GalleryModel> = parse_elements(b"", "test").unwrap();
        assert!(models.is_empty());
    }
}
