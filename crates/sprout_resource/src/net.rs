//! Network resources (`http://`, `https://`, `tcp://`, `ftp://`).
//!
//! Not implemented yet: [`NetResource`] fails every poll and refresh with a
//! not-implemented error. It is not registered in the default
//! [`ResourceFactory`](crate::ResourceFactory).

use crate::error::{PollError, RefreshError};
use crate::resource::{Resource, UpdateHandler};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const KIND: &str = "net";

/// A remote network resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetResource {
    url: String,
}

impl NetResource {
    /// Creates a resource for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The remote URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Resource for NetResource {
    async fn poll(&mut self, _cancel: &CancellationToken) -> Result<bool, PollError> {
        Err(PollError::NotImplemented(KIND))
    }

    async fn refresh(&self, _cancel: &CancellationToken, handler: &dyn UpdateHandler) {
        handler.on_error(RefreshError::NotImplemented(KIND)).await;
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
