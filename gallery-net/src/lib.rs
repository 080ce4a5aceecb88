// gallery-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{build_http_client, download_file, fetch_bytes, resolve_uri, DownloadStatusFn};
pub use validation::{validate_uri, verify_checksum};
