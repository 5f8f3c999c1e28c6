//! # Sprout Internal Library
//!
//! Re-exports the core sprout crates for convenience.

/// Layer 1: locators, the resource contract and resource kinds.
pub use sprout_resource;

/// Layer 2: the polling watch scheduler.
pub use sprout_watch;

/// Infrastructure: error reporting, update handlers, tracing setup.
pub use sprout_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use sprout_core::{FnHandler, JsonUpdate, TracingConfig, TracingFormat, WriteUpdate};
    pub use sprout_resource::{
        CancellationToken, DataStream, FactoryError, PollError, RefreshError, Resource,
        ResourceFactory, UpdateHandler,
    };
    pub use sprout_watch::{WatchConfig, WatchHandle, Watcher, watch};
}
