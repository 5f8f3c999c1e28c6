//! Object store client capability and its lazily-initialized shared handle.

use crate::error::ObjectStoreError;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::OnceCell;

/// Metadata reported by the store for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Content generation; changes when the object's data is replaced.
    pub generation: i64,
    /// Metadata generation; changes when the object's metadata is updated.
    pub metageneration: i64,
    /// MIME type of the object, if the store reports one.
    pub content_type: Option<String>,
}

type CloseFn = Box<dyn FnOnce() -> Result<(), ObjectStoreError> + Send>;

/// Streaming reader over an object's content.
///
/// Wraps any [`AsyncRead`] together with an optional close hook, which lets a
/// client report failures that only surface once the stream is released.
pub struct ObjectReader {
    body: Box<dyn AsyncRead + Send + Unpin>,
    on_close: Option<CloseFn>,
}

impl ObjectReader {
    /// Wraps a body stream with no close hook.
    pub fn new(body: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            body: Box::new(body),
            on_close: None,
        }
    }

    /// Adds a hook run by [`close`](Self::close).
    #[must_use]
    pub fn with_close(
        mut self,
        on_close: impl FnOnce() -> Result<(), ObjectStoreError> + Send + 'static,
    ) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }

    /// The body as a readable stream.
    pub fn body_mut(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        &mut *self.body
    }

    /// Releases the reader.
    ///
    /// # Errors
    ///
    /// Returns whatever the close hook reports.
    pub fn close(self) -> Result<(), ObjectStoreError> {
        drop(self.body);
        match self.on_close {
            Some(on_close) => on_close(),
            None => Ok(()),
        }
    }
}

impl core::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("has_close_hook", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

/// Client capability consumed by [`ObjectStoreResource`](super::ObjectStoreResource).
///
/// [`GcsClient`](super::GcsClient) talks to Google Cloud Storage; tests plug in
/// an in-memory implementation.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + 'static {
    /// Fetches the metadata of `bucket/key` without its content.
    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ObjectStoreError>;

    /// Opens a streaming reader over the content of `bucket/key`.
    async fn open_reader(&self, bucket: &str, key: &str) -> Result<ObjectReader, ObjectStoreError>;
}

type ClientInit = Box<
    dyn Fn() -> BoxFuture<'static, Result<Arc<dyn ObjectStoreClient>, ObjectStoreError>>
        + Send
        + Sync,
>;

struct Shared {
    cell: OnceCell<Arc<dyn ObjectStoreClient>>,
    init: ClientInit,
}

/// Shared handle to an object store client, initialized at most once.
///
/// Every object-store resource built from the same handle reuses one client.
/// A lazy handle runs its initializer on first use; concurrent first uses wait
/// for the same initialization. A failed initialization is not cached, so the
/// next poll tries again.
///
/// ```
/// use std::sync::Arc;
/// use sprout_resource::object_store::{GcsClient, GcsConfig, SharedObjectStore};
///
/// // Eager: the client is built up front.
/// let eager = SharedObjectStore::new(Arc::new(GcsClient::new(GcsConfig::default())));
/// assert!(eager.is_initialized());
///
/// // Lazy: the client is built on the first poll or refresh.
/// let lazy = SharedObjectStore::from_env();
/// assert!(!lazy.is_initialized());
/// ```
#[derive(Clone)]
pub struct SharedObjectStore {
    shared: Arc<Shared>,
}

impl SharedObjectStore {
    /// Wraps an already-built client.
    #[must_use]
    pub fn new(client: Arc<dyn ObjectStoreClient>) -> Self {
        let fallback = client.clone();
        Self {
            shared: Arc::new(Shared {
                cell: OnceCell::new_with(Some(client)),
                init: Box::new(move || {
                    let client = fallback.clone();
                    async move { Ok::<_, ObjectStoreError>(client) }.boxed()
                }),
            }),
        }
    }

    /// Creates a handle whose client is built by `init` on first use.
    pub fn lazy<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn ObjectStoreClient>, ObjectStoreError>> + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                cell: OnceCell::new(),
                init: Box::new(move || init().boxed()),
            }),
        }
    }

    /// Creates a lazy handle to a [`GcsClient`](super::GcsClient) configured
    /// from the environment (see [`GcsConfig::from_env`](super::GcsConfig::from_env)).
    #[must_use]
    pub fn from_env() -> Self {
        Self::lazy(|| async {
            let config = super::GcsConfig::from_env();
            tracing::debug!(endpoint = %config.endpoint(), "initializing object store client");
            Ok(Arc::new(super::GcsClient::new(config)) as Arc<dyn ObjectStoreClient>)
        })
    }

    /// Returns `true` once a client is available.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.shared.cell.initialized()
    }

    /// Returns the client, initializing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns the initializer's error if the client could not be built.
    pub async fn client(&self) -> Result<Arc<dyn ObjectStoreClient>, ObjectStoreError> {
        self.shared
            .cell
            .get_or_try_init(|| (self.shared.init)())
            .await
            .cloned()
    }
}

impl core::fmt::Debug for SharedObjectStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedObjectStore")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
