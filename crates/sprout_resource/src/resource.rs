//! The [`Resource`] and [`UpdateHandler`] traits.

use crate::error::{PollError, RefreshError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Readable stream over a resource's content, handed to [`UpdateHandler::on_data`].
pub type DataStream<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Receives the outcome of a [`Resource::refresh`].
///
/// For each refresh the resource calls exactly one of [`on_data`](Self::on_data)
/// or [`on_error`](Self::on_error) for the fetch itself. A failure to release the
/// fetch handle afterwards is reported through `on_error` as well, even when the
/// data was delivered.
///
/// Handlers run inside the watch task: a slow handler delays the next poll. Hand
/// heavy work off to another task and return promptly.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use sprout_resource::{DataStream, RefreshError, UpdateHandler};
/// use tokio::io::AsyncReadExt;
///
/// struct PrintLen;
///
/// #[async_trait]
/// impl UpdateHandler for PrintLen {
///     async fn on_data(&self, data: DataStream<'_>) {
///         let mut buf = Vec::new();
///         if data.read_to_end(&mut buf).await.is_ok() {
///             tracing::info!(bytes = buf.len(), "resource updated");
///         }
///     }
///
///     async fn on_error(&self, error: RefreshError) {
///         tracing::warn!(%error, "refresh failed");
///     }
/// }
/// ```
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Called with the new content. The stream is only valid for the duration
    /// of the call.
    async fn on_data(&self, data: DataStream<'_>);

    /// Called when fetching or releasing the content failed.
    async fn on_error(&self, error: RefreshError);
}

#[async_trait]
impl<H: UpdateHandler + ?Sized> UpdateHandler for Arc<H> {
    async fn on_data(&self, data: DataStream<'_>) {
        (**self).on_data(data).await;
    }

    async fn on_error(&self, error: RefreshError) {
        (**self).on_error(error).await;
    }
}

/// A pollable, refreshable data source.
///
/// Every resource keeps a *fingerprint* of the content it last observed
/// (modification time and size for files, generation numbers for stored
/// objects). [`poll`](Self::poll) compares that fingerprint against the source
/// and [`refresh`](Self::refresh) fetches the full content.
///
/// A resource under watch is driven exclusively by its watch task. Two watches
/// over the same source must each own their own resource value.
///
/// # Implementing a resource
///
/// ```
/// use async_trait::async_trait;
/// use sprout_resource::{PollError, RefreshError, Resource, UpdateHandler};
/// use tokio_util::sync::CancellationToken;
///
/// /// A resource whose content is a counter bumped elsewhere.
/// struct Counter {
///     seen: u64,
///     current: std::sync::Arc<std::sync::atomic::AtomicU64>,
/// }
///
/// #[async_trait]
/// impl Resource for Counter {
///     async fn poll(&mut self, _cancel: &CancellationToken) -> Result<bool, PollError> {
///         let now = self.current.load(std::sync::atomic::Ordering::SeqCst);
///         if now == self.seen {
///             return Ok(false);
///         }
///         self.seen = now;
///         Ok(true)
///     }
///
///     async fn refresh(&self, _cancel: &CancellationToken, handler: &dyn UpdateHandler) {
///         let text = self.seen.to_string();
///         handler.on_data(&mut text.as_bytes()).await;
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Checks the source for changes without fetching its content.
    ///
    /// Returns `Ok(true)` and records the new fingerprint if the source changed
    /// since the last successful poll, `Ok(false)` without touching any state if
    /// it did not.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] if the source could not be inspected. The stored
    /// fingerprint is left unchanged.
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<bool, PollError>;

    /// Fetches the full content and hands it to `handler`.
    ///
    /// Must not change the stored fingerprint. Implementations release any
    /// fetch handle once `on_data` returns.
    async fn refresh(&self, cancel: &CancellationToken, handler: &dyn UpdateHandler);

    /// Human-readable description used in logs.
    fn describe(&self) -> String {
        core::any::type_name::<Self>().to_string()
    }
}

#[async_trait]
impl<R: Resource + ?Sized> Resource for Box<R> {
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<bool, PollError> {
        (**self).poll(cancel).await
    }

    async fn refresh(&self, cancel: &CancellationToken, handler: &dyn UpdateHandler) {
        (**self).refresh(cancel, handler).await;
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl core::fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Resource").field(&self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetResource;

    #[test]
    fn boxed_resource_debug_shows_description() {
        let resource: Box<dyn Resource> = Box::new(NetResource::new("net://host/flags"));
        assert_eq!(format!("{resource:?}"), r#"Resource("net://host/flags")"#);
    }
}
