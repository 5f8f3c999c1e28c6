//! Ready-made [`UpdateHandler`] implementations.
//!
//! | Handler | On data | On error |
//! |---------|---------|----------|
//! | [`WriteUpdate`] | copies the content into an `AsyncWrite` sink | [`report`] |
//! | [`JsonUpdate`] | decodes JSON into a shared value | [`report`] |
//! | [`FnHandler`] | calls a closure with the full content | closure or [`report`] |
//!
//! Failures inside the adapters themselves (a sink that stops accepting writes,
//! malformed JSON) are also passed to [`report`].

use crate::error_handler::report;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sprout_resource::{DataStream, RefreshError, UpdateHandler};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Error turning delivered content into a value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The content stream failed mid-read.
    #[error("failed to read update: {0}")]
    Read(#[from] std::io::Error),

    /// The content is not valid JSON for the target type.
    #[error("failed to decode update as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// WriteUpdate
// ─────────────────────────────────────────────────────────────────────────────

/// Copies every update into a writer, flushing after each one.
///
/// ```
/// use sprout_core::WriteUpdate;
///
/// let handler = WriteUpdate::new(Vec::<u8>::new());
/// assert!(handler.into_inner().is_empty());
/// ```
#[derive(Debug)]
pub struct WriteUpdate<W> {
    sink: tokio::sync::Mutex<W>,
}

impl<W> WriteUpdate<W>
where
    W: AsyncWrite + Send + Unpin,
{
    /// Wraps `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink: tokio::sync::Mutex::new(sink),
        }
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

#[async_trait]
impl<W> UpdateHandler for WriteUpdate<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn on_data(&self, data: DataStream<'_>) {
        let mut sink = self.sink.lock().await;
        let copied = tokio::io::copy(data, &mut *sink).await;
        let result = match copied {
            Ok(_) => sink.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            report(&RefreshError::Read(err));
        }
    }

    async fn on_error(&self, error: RefreshError) {
        report(&error);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JsonUpdate
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes each update as JSON and stores it in a shared value.
///
/// The previous value is kept when an update fails to decode.
///
/// ```
/// use serde::Deserialize;
/// use sprout_core::JsonUpdate;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Flags {
///     dark_mode: bool,
/// }
///
/// let handler = JsonUpdate::<Flags>::default();
/// let flags = handler.target();
/// assert!(!flags.lock().dark_mode);
/// ```
#[derive(Debug)]
pub struct JsonUpdate<T> {
    target: Arc<Mutex<T>>,
}

impl<T: Default> Default for JsonUpdate<T> {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(T::default())))
    }
}

impl<T> JsonUpdate<T> {
    /// Stores decoded updates into `target`.
    pub fn new(target: Arc<Mutex<T>>) -> Self {
        Self { target }
    }

    /// The shared value updated by this handler.
    #[must_use]
    pub fn target(&self) -> Arc<Mutex<T>> {
        self.target.clone()
    }
}

impl<T: DeserializeOwned> JsonUpdate<T> {
    async fn decode(data: DataStream<'_>) -> Result<T, DecodeError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf).await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

#[async_trait]
impl<T> UpdateHandler for JsonUpdate<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn on_data(&self, data: DataStream<'_>) {
        match Self::decode(data).await {
            Ok(value) => *self.target.lock() = value,
            Err(err) => report(&err),
        }
    }

    async fn on_error(&self, error: RefreshError) {
        report(&error);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FnHandler
// ─────────────────────────────────────────────────────────────────────────────

type ErrorFn = Box<dyn Fn(RefreshError) + Send + Sync>;

/// Calls a closure with the full content of each update.
///
/// ```
/// use sprout_core::FnHandler;
///
/// let handler = FnHandler::new(|bytes| tracing::info!(len = bytes.len(), "updated"))
///     .with_error(|err| tracing::warn!(%err, "refresh failed"));
/// ```
pub struct FnHandler<F> {
    on_data: F,
    on_error: Option<ErrorFn>,
}

impl<F> core::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnHandler")
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl<F> FnHandler<F>
where
    F: Fn(Vec<u8>) + Send + Sync + 'static,
{
    /// Calls `on_data` with each update's bytes. Errors go to [`report`].
    pub fn new(on_data: F) -> Self {
        Self {
            on_data,
            on_error: None,
        }
    }

    /// Sends refresh errors to `on_error` instead of [`report`].
    #[must_use]
    pub fn with_error<E>(mut self, on_error: E) -> Self
    where
        E: Fn(RefreshError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    fn fail(&self, error: RefreshError) {
        match &self.on_error {
            Some(on_error) => on_error(error),
            None => report(&error),
        }
    }
}

#[async_trait]
impl<F> UpdateHandler for FnHandler<F>
where
    F: Fn(Vec<u8>) + Send + Sync + 'static,
{
    async fn on_data(&self, data: DataStream<'_>) {
        let mut buf = Vec::new();
        match data.read_to_end(&mut buf).await {
            Ok(_) => (self.on_data)(buf),
            Err(err) => self.fail(RefreshError::Read(err)),
        }
    }

    async fn on_error(&self, error: RefreshError) {
        self.fail(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::{reset_error_handler, set_error_handler, test_lock};
    use serde::Deserialize;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Flags {
        dark_mode: bool,
        limit: u32,
    }

    /// Reader that fails on the first read.
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::other("stream reset")))
        }
    }

    fn capture_reports() -> Arc<std::sync::Mutex<Vec<String>>> {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        set_error_handler(move |err| sink.lock().unwrap().push(err.to_string()));
        seen
    }

    #[tokio::test]
    async fn write_update_copies_content() {
        let handler = WriteUpdate::new(Vec::new());

        handler.on_data(&mut &b"first "[..]).await;
        handler.on_data(&mut &b"second"[..]).await;

        assert_eq!(handler.into_inner(), b"first second");
    }

    #[tokio::test]
    async fn json_update_replaces_value() {
        let handler = JsonUpdate::<Flags>::default();
        let flags = handler.target();

        handler
            .on_data(&mut &br#"{"dark_mode": true, "limit": 7}"#[..])
            .await;

        assert_eq!(
            *flags.lock(),
            Flags {
                dark_mode: true,
                limit: 7
            }
        );
    }

    #[tokio::test]
    async fn json_update_keeps_value_on_bad_input() {
        let _guard = test_lock();
        let reports = capture_reports();
        let target = Arc::new(Mutex::new(Flags {
            dark_mode: true,
            limit: 1,
        }));
        let handler = JsonUpdate::new(target.clone());

        handler.on_data(&mut &b"{not json"[..]).await;
        reset_error_handler();

        assert_eq!(target.lock().limit, 1);
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("failed to decode update as JSON"));
    }

    #[tokio::test]
    async fn refresh_errors_are_reported() {
        let _guard = test_lock();
        let reports = capture_reports();
        let handler = WriteUpdate::new(Vec::new());

        handler
            .on_error(RefreshError::NotImplemented("net"))
            .await;
        reset_error_handler();

        assert_eq!(
            *reports.lock().unwrap(),
            vec!["net resource is not implemented yet".to_string()]
        );
    }

    #[tokio::test]
    async fn fn_handler_receives_bytes_and_errors() {
        let data = Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (data_sink, error_sink) = (data.clone(), errors.clone());

        let handler = FnHandler::new(move |bytes| data_sink.lock().unwrap().push(bytes))
            .with_error(move |err| error_sink.lock().unwrap().push(err.to_string()));

        handler.on_data(&mut &b"payload"[..]).await;
        handler.on_data(&mut Broken).await;
        handler.on_error(RefreshError::other("gone")).await;

        assert_eq!(*data.lock().unwrap(), vec![b"payload".to_vec()]);
        assert_eq!(
            *errors.lock().unwrap(),
            vec![
                "failed to read resource data: stream reset".to_string(),
                "gone".to_string()
            ]
        );
    }
}
