//! Core infrastructure for sprout.
//!
//! - [`error_handler`]: process-wide sink for errors that have no caller to
//!   return to
//! - [`WriteUpdate`], [`JsonUpdate`], [`FnHandler`]: ready-made update handlers
//! - [`TracingConfig`]: tracing subscriber setup

pub mod error_handler;
mod tracing_config;
mod update;

pub use tracing_config::{TracingConfig, TracingFormat, TracingInitError};
pub use update::{DecodeError, FnHandler, JsonUpdate, WriteUpdate};
