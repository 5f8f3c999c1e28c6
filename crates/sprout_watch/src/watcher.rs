//! The watch loop.
//!
//! A watch session owns one [`Resource`] and drives it from a single tokio task:
//!
//! ```text
//!            ┌──────────── every `interval` ────────────┐
//!            ▼                                          │
//!   poll ──► unchanged ─────────────────────────────────┤
//!     │                                                 │
//!     ├───► changed ──► refresh ──► on_data / on_error ─┤
//!     │                                                 │
//!     └───► error ───► error stream ────────────────────┘
//! ```
//!
//! The timer is re-armed after each tick completes, so a slow poll, refresh or
//! handler pushes the next tick back instead of stacking ticks up. Cancellation
//! is checked before every tick and before every refresh; a refresh already in
//! flight runs to completion. Publishing a poll error never blocks: when the
//! caller has not drained the error stream the new error is dropped.

use core::ops::ControlFlow;
use core::time::Duration;
use sprout_resource::{PollError, Resource, UpdateHandler};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of poll errors buffered for the caller.
pub const DEFAULT_ERROR_BUFFER: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors configuring or joining a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The polling interval was zero.
    #[error("watch interval must be non-zero")]
    ZeroInterval,

    /// The error buffer was zero.
    #[error("error buffer must hold at least one error")]
    ZeroErrorBuffer,

    /// The watch task panicked or was aborted.
    #[error("watch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// ─────────────────────────────────────────────────────────────────────────────
// WatchConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for a watch session.
///
/// ```
/// use std::time::Duration;
/// use sprout_watch::WatchConfig;
///
/// let config = WatchConfig::new(Duration::from_millis(500)).with_error_buffer(64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    interval: Duration,
    error_buffer: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            error_buffer: DEFAULT_ERROR_BUFFER,
        }
    }
}

impl WatchConfig {
    /// Creates a configuration polling every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::default().with_interval(interval)
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how many unread poll errors are buffered. Errors arriving while
    /// the buffer is full are dropped.
    #[must_use]
    pub fn with_error_buffer(mut self, error_buffer: usize) -> Self {
        self.error_buffer = error_buffer;
        self
    }

    /// The polling interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The error buffer capacity.
    #[must_use]
    pub fn error_buffer(&self) -> usize {
        self.error_buffer
    }

    /// Checks that the configuration can drive a watch.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ZeroInterval`] or [`WatchError::ZeroErrorBuffer`].
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.interval.is_zero() {
            return Err(WatchError::ZeroInterval);
        }
        if self.error_buffer == 0 {
            return Err(WatchError::ZeroErrorBuffer);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Spawns watch sessions with a validated [`WatchConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Watcher {
    config: WatchConfig,
}

impl Watcher {
    /// Creates a watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`WatchConfig::validate`].
    pub fn new(config: WatchConfig) -> Result<Self, WatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration used for new sessions.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Starts watching `resource` until `cancel` fires.
    ///
    /// The first poll happens one interval after this call.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<R, H>(&self, cancel: CancellationToken, resource: R, handler: H) -> WatchHandle
    where
        R: Resource,
        H: UpdateHandler + 'static,
    {
        let (errors_tx, errors_rx) = mpsc::channel(self.config.error_buffer);
        let span = tracing::info_span!("watch", resource = %resource.describe());

        let session = Session {
            resource,
            handler,
            cancel: cancel.clone(),
            errors: errors_tx,
            interval: self.config.interval,
        };
        let task = tokio::spawn(session.run().instrument(span));

        WatchHandle {
            errors: errors_rx,
            cancel,
            task,
        }
    }
}

/// Watches `resource`, polling every `interval` until `cancel` fires.
///
/// Changed content is delivered to `handler`; poll failures are published on
/// the returned handle's error stream, which closes when the watch stops.
///
/// ```no_run
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use std::time::Duration;
/// use sprout_resource::ResourceFactory;
/// use sprout_resource::testing::RecordingHandler;
/// use sprout_watch::watch;
/// use tokio_util::sync::CancellationToken;
///
/// let resource = ResourceFactory::default().create("./flags.json").await?;
/// let cancel = CancellationToken::new();
/// let mut handle = watch(cancel.clone(), Duration::from_secs(5), resource, RecordingHandler::new());
///
/// while let Some(error) = handle.next_error().await {
///     tracing::warn!(%error, "poll failed");
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Panics
///
/// Panics if `interval` is zero or if called outside a tokio runtime. For an
/// interval that comes from configuration, build a [`Watcher`] instead:
/// [`Watcher::new`] reports a zero interval as [`WatchError::ZeroInterval`].
pub fn watch<R, H>(
    cancel: CancellationToken,
    interval: Duration,
    resource: R,
    handler: H,
) -> WatchHandle
where
    R: Resource,
    H: UpdateHandler + 'static,
{
    assert!(!interval.is_zero(), "watch interval must be non-zero");
    Watcher {
        config: WatchConfig::new(interval),
    }
    .spawn(cancel, resource, handler)
}

// ─────────────────────────────────────────────────────────────────────────────
// WatchHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Polling on schedule.
    Running,
    /// Cancellation requested; the loop has not exited yet (e.g. a refresh is
    /// still in flight).
    Cancelling,
    /// The loop has exited and the error stream is closed.
    Stopped,
}

/// Handle to a running watch session.
///
/// Dropping the handle does not stop the watch; cancel its token for that.
/// Once the handle is dropped, poll errors are discarded. Errors that arrive
/// while the stream is full are discarded too.
#[derive(Debug)]
pub struct WatchHandle {
    errors: mpsc::Receiver<PollError>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Waits for the next poll error. Returns `None` once the watch stopped and
    /// all buffered errors were read.
    pub async fn next_error(&mut self) -> Option<PollError> {
        self.errors.recv().await
    }

    /// Returns a buffered poll error without waiting.
    pub fn try_next_error(&mut self) -> Option<PollError> {
        self.errors.try_recv().ok()
    }

    /// The underlying error stream.
    pub fn errors(&mut self) -> &mut mpsc::Receiver<PollError> {
        &mut self.errors
    }

    /// Consumes the handle, keeping only the error stream. The watch keeps
    /// running until its token is cancelled.
    #[must_use]
    pub fn into_errors(self) -> mpsc::Receiver<PollError> {
        self.errors
    }

    /// Requests cancellation. No poll or refresh starts after this.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The session's cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        if self.task.is_finished() {
            WatchState::Stopped
        } else if self.cancel.is_cancelled() {
            WatchState::Cancelling
        } else {
            WatchState::Running
        }
    }

    /// Returns `true` once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to exit. Does not cancel it.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Task`] if the watch task panicked.
    pub async fn join(self) -> Result<(), WatchError> {
        self.task.await?;
        Ok(())
    }

    /// Cancels the watch and waits for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Task`] if the watch task panicked.
    pub async fn stop(self) -> Result<(), WatchError> {
        self.cancel();
        self.join().await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session (internal)
// ─────────────────────────────────────────────────────────────────────────────

struct Session<R, H> {
    resource: R,
    handler: H,
    cancel: CancellationToken,
    errors: mpsc::Sender<PollError>,
    interval: Duration,
}

impl<R: Resource, H: UpdateHandler> Session<R, H> {
    async fn run(mut self) {
        tracing::info!(interval = ?self.interval, "watch started");

        let timer = time::sleep(self.interval);
        tokio::pin!(timer);

        loop {
            // Cancellation wins over a due tick.
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = &mut timer => {}
            }

            if self.tick().await.is_break() {
                break;
            }
            timer.as_mut().reset(Instant::now() + self.interval);
        }

        tracing::info!("watch stopped");
    }

    async fn tick(&mut self) -> ControlFlow<()> {
        match self.resource.poll(&self.cancel).await {
            Ok(false) => {
                tracing::debug!("resource unchanged");
                ControlFlow::Continue(())
            }
            Ok(true) => {
                if self.cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
                tracing::info!("resource changed, refreshing");
                self.resource.refresh(&self.cancel, &self.handler).await;
                ControlFlow::Continue(())
            }
            Err(_) if self.cancel.is_cancelled() => ControlFlow::Break(()),
            Err(err) => {
                tracing::warn!(error = %err, "poll failed");
                self.publish(err);
                ControlFlow::Continue(())
            }
        }
    }

    fn publish(&self, err: PollError) {
        match self.errors.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                tracing::warn!(error = %err, "error stream full, dropping poll error");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("error stream dropped by caller, discarding poll error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert_eq!(config.error_buffer(), DEFAULT_ERROR_BUFFER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = WatchConfig::new(Duration::ZERO);
        assert!(matches!(config.validate(), Err(WatchError::ZeroInterval)));
        assert!(matches!(Watcher::new(config), Err(WatchError::ZeroInterval)));
    }

    #[test]
    fn zero_error_buffer_is_rejected() {
        let config = WatchConfig::default().with_error_buffer(0);
        assert!(matches!(config.validate(), Err(WatchError::ZeroErrorBuffer)));
    }

    #[test]
    fn watch_error_display() {
        assert_eq!(
            WatchError::ZeroInterval.to_string(),
            "watch interval must be non-zero"
        );
    }
}
