//! Pluggable, pollable data sources for sprout.
//!
//! A [`Resource`] is anything whose content can change: a local file, an
//! object in a cloud bucket, or a custom source. Resources detect changes
//! cheaply through a *fingerprint* ([`Resource::poll`]) and fetch the full
//! content only when it changed ([`Resource::refresh`]).
//!
//! # Overview
//!
//! - [`locator`] - turns an address string into a `(scheme, remainder)` pair.
//! - [`Resource`] / [`UpdateHandler`] - the capability contract every source
//!   implements and the callbacks that receive its content.
//! - [`ResourceFactory`] - builds the right resource for an address.
//! - [`file`], [`object_store`], [`net`] - built-in resource kinds.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), sprout_resource::FactoryError> {
//! use sprout_resource::{Resource, ResourceFactory};
//! use tokio_util::sync::CancellationToken;
//!
//! let factory = ResourceFactory::default();
//! let mut resource = factory.create("gs://my-bucket/flags.json").await?;
//!
//! if resource.poll(&CancellationToken::new()).await.unwrap_or(false) {
//!     // fetch with resource.refresh(..)
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables the [`testing`] module (scripted resource,
//!   recording handler, in-memory object store).

pub mod error;
mod factory;
pub mod file;
pub mod locator;
pub mod net;
pub mod object_store;
mod resource;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{FactoryError, LocatorError, ObjectStoreError, PollError, RefreshError};
pub use factory::{ResourceBuilder, ResourceFactory};
pub use locator::{Locator, resolve};
pub use resource::{DataStream, Resource, UpdateHandler};
pub use tokio_util::sync::CancellationToken;
