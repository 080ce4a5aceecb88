// gallery-core/src/lib.rs
pub mod catalog;
pub mod endpoints;
pub mod install;
pub mod registry;
pub mod service;
pub mod uninstall;

pub use catalog::{find_gallery_element, LookupPolicy};
pub use endpoints::{ApplyRequest, GalleryEndpoints, OpResponse};
pub use registry::BackendRegistry;
pub use service::{GalleryService, OpContext, OpHandler};
