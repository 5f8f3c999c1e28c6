//! Error types for locator resolution, resource construction and resource I/O.
//!
//! Each stage of a watch has its own error type so callers can tell which
//! stage failed without inspecting messages:
//!
//! | Error | Raised by | Effect on a running watch |
//! |-------|-----------|---------------------------|
//! | [`LocatorError`] | [`resolve`](crate::locator::resolve) | n/a (fatal to one `create` call) |
//! | [`FactoryError`] | [`ResourceFactory::create`](crate::ResourceFactory::create) | n/a (fatal to one `create` call) |
//! | [`PollError`] | [`Resource::poll`](crate::Resource::poll) | published on the error stream, polling continues |
//! | [`RefreshError`] | [`Resource::refresh`](crate::Resource::refresh) | delivered to the handler's `on_error`, polling continues |
//! | [`ObjectStoreError`] | [`ObjectStoreClient`](crate::object_store::ObjectStoreClient) | wrapped by [`PollError`] / [`RefreshError`] |

use std::path::PathBuf;

/// Boxed error used by custom resource implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error resolving an address string into a [`Locator`](crate::Locator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    /// The address was empty.
    #[error("empty resource address")]
    Empty,

    /// The address started with `:`.
    #[error("missing protocol scheme in '{0}'")]
    MissingScheme(String),

    /// The address had a scheme but nothing after it.
    #[error("missing resource path in '{0}'")]
    MissingPath(String),
}

/// Error creating a resource from an address.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// The address could not be resolved.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// No resource kind is registered for the resolved scheme.
    #[error("cannot derive resource type from scheme '{0}'")]
    UnknownResourceType(String),

    /// The scheme is known but the remainder is not valid for it.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending remainder.
        address: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The initial fingerprint of a file could not be captured.
    #[error("failed to stat '{}': {source}", path.display())]
    Stat {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Error raised while checking a resource for changes.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The file could not be inspected (missing, permissions, ...).
    #[error("failed to stat '{}': {source}", path.display())]
    Stat {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The object store could not report the object's metadata.
    #[error("object store poll failed: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    /// The poll was abandoned because the watch was cancelled.
    #[error("poll cancelled")]
    Cancelled,

    /// The resource kind cannot be polled yet.
    #[error("{0} resource is not implemented yet")]
    NotImplemented(&'static str),

    /// Error raised by a custom resource implementation.
    #[error(transparent)]
    Other(BoxError),
}

impl PollError {
    /// Wraps an arbitrary error from a custom resource.
    pub fn other(error: impl Into<BoxError>) -> Self {
        Self::Other(error.into())
    }
}

/// Error raised while fetching a resource's content.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The file could not be opened.
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The object could not be fetched from the store.
    #[error("object store fetch failed: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    /// The fetch handle could not be released after the data was delivered.
    #[error("failed to release fetch handle: {0}")]
    Release(#[source] ObjectStoreError),

    /// Reading the delivered stream failed.
    #[error("failed to read resource data: {0}")]
    Read(#[source] std::io::Error),

    /// The resource kind cannot be refreshed yet.
    #[error("{0} resource is not implemented yet")]
    NotImplemented(&'static str),

    /// Error raised by a custom resource implementation.
    #[error(transparent)]
    Other(BoxError),
}

impl RefreshError {
    /// Wraps an arbitrary error from a custom resource.
    pub fn other(error: impl Into<BoxError>) -> Self {
        Self::Other(error.into())
    }
}

/// Error reported by an [`ObjectStoreClient`](crate::object_store::ObjectStoreClient).
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// The object does not exist.
    #[error("object not found: {bucket}/{key}")]
    NotFound {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// The client could not be initialized.
    #[error("object store client unavailable: {0}")]
    Init(String),

    /// Authentication or authorization was rejected.
    #[error("object store authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connection refused, timeout, ...).
    #[error("http error: {0}")]
    Http(String),

    /// The store answered with a non-success status.
    #[error("object store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The store answered with something we could not interpret.
    #[error("invalid object store response: {0}")]
    InvalidResponse(String),

    /// Local I/O failure while talking to the store.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
