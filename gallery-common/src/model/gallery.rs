// gallery-common/src/model/gallery.rs
use serde::{Deserialize, Serialize};

/// One remote catalog a manifest is loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GallerySource {
    pub url: String,
    pub name: String,
}

impl GallerySource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}
