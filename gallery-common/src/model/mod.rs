// gallery-common/src/model/mod.rs
pub mod backend;
pub mod gallery;
pub mod gallery_model;
pub mod installed;

pub use backend::{BackendEntry, GalleryBackend};
pub use gallery::GallerySource;
pub use gallery_model::GalleryModel;
pub use installed::{config_file_name, File, InstalledConfig, InstalledRecord, CONFIG_EXTENSION};

/// Capabilities shared by every installable catalog entry. Fetching, resolving
/// and locating are written once against this trait.
pub trait GalleryElement {
    fn set_gallery(&mut self, gallery: GallerySource);
    fn set_installed(&mut self, installed: bool);
    fn name(&self) -> &str;
    fn gallery(&self) -> &GallerySource;
    fn is_installed(&self) -> bool;
    fn description(&self) -> &str;
    fn tags(&self) -> &[String];

    /// `<gallery>@<name>`, the form accepted by qualified lookups.
    fn qualified_name(&self) -> String {
        format!("{}@{}", self.gallery().name, self.name())
    }
}
