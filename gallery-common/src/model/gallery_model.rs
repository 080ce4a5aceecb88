// gallery-common/src/model/gallery_model.rs
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};

use super::{File, GalleryElement, GallerySource};

/// A model entry as published in a gallery manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryModel {
    pub name: String,
    /// Remote config document used verbatim as the install base.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Inline config document, used when `url` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<Value>,
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
    #[serde(default)]
    pub additional_files: Vec<File>,
    #[serde(default)]
    pub overrides: Mapping,

    #[serde(default, skip_deserializing)]
    pub gallery: GallerySource,
    #[serde(default, skip_deserializing)]
    pub installed: bool,
}

impl GalleryElement for GalleryModel {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest_entry_with_inline_config() {
        let yaml = r#"
name: phi-2
description: A small model
license: mit
urls:
  - https://example.com/phi-2
config_file:
  backend: llama-cpp
  parameters:
    model: phi-2.gguf
overrides:
  context_size: 2048
additional_files:
  - filename: phi-2.gguf
    sha256: abc
    uri: https://example.com/phi-2.gguf
"#;
        let model: GalleryModel = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(model.name, "phi-2");
        assert!(model.url.is_empty());
        assert!(model.config_file.is_some());
        assert_eq!(model.additional_files.len(), 1);
        assert_eq!(model.overrides.len(), 1);
        assert!(!model.installed);
    }

    #[test]
    fn gallery_and_installed_are_not_read_from_manifest() {
        let yaml = r#"
name: llama
url: https://example.com/llama.yaml
installed: true
gallery:
  name: spoofed
  url: https://evil.example.com
"#;
        let model: GalleryModel = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(!model.installed);
        assert_eq!(model.gallery, GallerySource::default());
    }

    #[test]
    fn qualified_name_prefixes_the_gallery() {
        let mut model = GalleryModel {
            name: "llama".into(),
            ..Default::default()
        };
        model.set_gallery(GallerySource::new("localai", "https://example.com/index.yaml"));
        assert_eq!(model.qualified_name(), "localai@llama");
    }
}
