//! Cloud object store resources.
//!
//! An [`ObjectStoreResource`] detects changes through the object's generation
//! numbers and streams its content through an [`ObjectStoreClient`]. All
//! resources built from one [`SharedObjectStore`] share a single client, which
//! is created on first use.
//!
//! ```no_run
//! # async fn demo() {
//! use sprout_resource::Resource;
//! use sprout_resource::object_store::{ObjectStoreResource, SharedObjectStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = SharedObjectStore::from_env();
//! let mut resource = ObjectStoreResource::new(store, "my-bucket", "config/app.json");
//! let changed = resource.poll(&CancellationToken::new()).await;
//! # }
//! ```

mod client;
mod gcs;
mod resource;

pub use client::{ObjectMetadata, ObjectReader, ObjectStoreClient, SharedObjectStore};
pub use gcs::{ACCESS_TOKEN_ENV, DEFAULT_ENDPOINT, EMULATOR_HOST_ENV, GcsClient, GcsConfig};
pub use resource::{ObjectFingerprint, ObjectStoreResource};

/// Common content types reported for stored objects.
pub mod content_type {
    /// Gzip archive.
    pub const GZIP: &str = "application/gzip";
    /// Zip archive, legacy Windows type.
    pub const X_ZIP: &str = "application/x-zip-compressed";
    /// Zip archive.
    pub const ZIP: &str = "application/zip";
    /// Arbitrary binary data.
    pub const OCTET_STREAM: &str = "application/octet-stream";
    /// Arbitrary binary data, non-standard variant.
    pub const BINARY_OCTET_STREAM: &str = "binary/octet-stream";
    /// Plain text.
    pub const TEXT_PLAIN: &str = "text/plain";
    /// XML document.
    pub const XML: &str = "text/xml";
    /// Shell script.
    pub const X_SH: &str = "text/x-sh";
    /// Comma-separated values.
    pub const CSV: &str = "text/csv";
}
