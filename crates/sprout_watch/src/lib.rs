//! Polling scheduler for sprout resources.
//!
//! [`watch`] spawns a task that polls a [`Resource`](sprout_resource::Resource)
//! on a fixed interval, refreshes it when the poll reports a change and
//! publishes poll failures on an error stream held by the returned
//! [`WatchHandle`]. Each session owns its resource exclusively; run as many
//! sessions as needed, they share nothing.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use sprout_resource::ResourceFactory;
//! use sprout_resource::testing::RecordingHandler;
//! use sprout_watch::{WatchConfig, Watcher};
//! use tokio_util::sync::CancellationToken;
//!
//! let watcher = Watcher::new(WatchConfig::new(Duration::from_millis(500)))?;
//! let resource = ResourceFactory::default().create("gs://flags/prod.json").await?;
//!
//! let handle = watcher.spawn(CancellationToken::new(), resource, RecordingHandler::new());
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

mod watcher;

pub use watcher::{
    DEFAULT_ERROR_BUFFER, DEFAULT_INTERVAL, WatchConfig, WatchError, WatchHandle, WatchState,
    Watcher, watch,
};
