// gallery-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;
pub mod operation;

// Re-export key types
pub use config::Config;
pub use error::{GalleryError, Result};
pub use model::{GalleryBackend, GalleryElement, GalleryModel, GallerySource};
pub use operation::{GalleryOp, InstallRequest, OpKind, OpState, OpStatus, OpTarget};
