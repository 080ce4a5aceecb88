// gallery-core/src/catalog/mod.rs
//! Catalog handling: fetching gallery manifests, merging them into one
//! addressable collection and locating elements by name.

pub mod fetch;
pub mod locate;
pub mod resolve;

pub use fetch::{fetch_gallery_elements, resolve_reference_url, REFERENCE_SUFFIX};
pub use locate::{find_gallery_element, normalize_name, search_elements, LookupPolicy};
pub use resolve::{available_backends, available_elements, available_models, is_installed};
