//! [`ObjectStoreResource`].

use super::client::SharedObjectStore;
use crate::error::{FactoryError, PollError, RefreshError};
use crate::resource::{Resource, UpdateHandler};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Version fingerprint of a stored object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFingerprint {
    /// Content generation.
    pub generation: i64,
    /// Metadata generation.
    pub metageneration: i64,
}

/// An object in a bucket, polled through its generation numbers.
///
/// A new resource starts from a zero fingerprint, so the first successful poll
/// reports a change and the first refresh delivers the current content.
///
/// Consult [`content_type`](Self::content_type) when interpreting the delivered
/// stream; common values are listed in [`content_type`](super::content_type).
#[derive(Debug, Clone)]
pub struct ObjectStoreResource {
    store: SharedObjectStore,
    bucket: String,
    prefix: String,
    fingerprint: ObjectFingerprint,
    content_type: Option<String>,
}

impl ObjectStoreResource {
    /// Creates a resource for `bucket/prefix`.
    #[must_use]
    pub fn new(store: SharedObjectStore, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
            fingerprint: ObjectFingerprint::default(),
            content_type: None,
        }
    }

    /// Creates a resource from a `bucket[/prefix]` path.
    ///
    /// The first `/` separates the bucket from the prefix; a missing prefix is
    /// the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidAddress`] if the bucket name is empty.
    pub fn from_path(store: SharedObjectStore, path: &str) -> Result<Self, FactoryError> {
        let (bucket, prefix) = path.split_once('/').unwrap_or((path, ""));
        if bucket.is_empty() {
            return Err(FactoryError::InvalidAddress {
                address: path.to_string(),
                reason: "missing bucket name",
            });
        }
        Ok(Self::new(store, bucket, prefix))
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key within the bucket.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fingerprint recorded by the last successful poll.
    #[must_use]
    pub fn fingerprint(&self) -> ObjectFingerprint {
        self.fingerprint
    }

    /// Content type recorded by the last poll that detected a change.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[async_trait]
impl Resource for ObjectStoreResource {
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<bool, PollError> {
        let client = self.store.client().await?;

        let metadata = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled),
            metadata = client.metadata(&self.bucket, &self.prefix) => metadata?,
        };

        let current = ObjectFingerprint {
            generation: metadata.generation,
            metageneration: metadata.metageneration,
        };
        if current == self.fingerprint {
            return Ok(false);
        }

        tracing::debug!(
            bucket = %self.bucket,
            key = %self.prefix,
            generation = current.generation,
            metageneration = current.metageneration,
            "object fingerprint changed"
        );
        self.fingerprint = current;
        self.content_type = metadata.content_type;
        Ok(true)
    }

    async fn refresh(&self, _cancel: &CancellationToken, handler: &dyn UpdateHandler) {
        let client = match self.store.client().await {
            Ok(client) => client,
            Err(err) => {
                handler.on_error(err.into()).await;
                return;
            }
        };

        let mut reader = match client.open_reader(&self.bucket, &self.prefix).await {
            Ok(reader) => reader,
            Err(err) => {
                handler.on_error(err.into()).await;
                return;
            }
        };

        handler.on_data(reader.body_mut()).await;

        if let Err(err) = reader.close() {
            handler.on_error(RefreshError::Release(err)).await;
        }
    }

    fn describe(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjectStoreError;
    use crate::testing::{FakeObjectStore, RecordingHandler};
    use std::sync::Arc;

    fn resource(fake: &Arc<FakeObjectStore>, path: &str) -> ObjectStoreResource {
        ObjectStoreResource::from_path(SharedObjectStore::new(fake.clone()), path).unwrap()
    }

    #[test]
    fn path_splits_bucket_and_prefix() {
        let fake = Arc::new(FakeObjectStore::new());
        let cases = [
            ("google-bucket/one", "google-bucket", "one"),
            ("google-bucket/", "google-bucket", ""),
            ("google-bucket", "google-bucket", ""),
            ("b/nested/key.json", "b", "nested/key.json"),
        ];
        for (path, bucket, prefix) in cases {
            let res = resource(&fake, path);
            assert_eq!(res.bucket(), bucket, "bucket for {path}");
            assert_eq!(res.prefix(), prefix, "prefix for {path}");
        }
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let store = SharedObjectStore::new(Arc::new(FakeObjectStore::new()));
        assert!(matches!(
            ObjectStoreResource::from_path(store, "/key"),
            Err(FactoryError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn first_poll_reports_change_then_settles() {
        let fake = Arc::new(FakeObjectStore::new());
        fake.put("b", "k", "application/json", b"{}");
        let mut res = resource(&fake, "b/k");
        let cancel = CancellationToken::new();

        assert!(res.poll(&cancel).await.unwrap());
        assert_eq!(res.content_type(), Some("application/json"));
        assert!(!res.poll(&cancel).await.unwrap());

        fake.put("b", "k", "application/json", b"{\"a\":1}");
        assert!(res.poll(&cancel).await.unwrap());
        assert_eq!(res.fingerprint().generation, 2);
    }

    #[tokio::test]
    async fn metadata_only_update_is_a_change() {
        let fake = Arc::new(FakeObjectStore::new());
        fake.put("b", "k", "text/plain", b"same");
        let mut res = resource(&fake, "b/k");
        let cancel = CancellationToken::new();
        res.poll(&cancel).await.unwrap();

        fake.touch_metadata("b", "k", "text/csv");
        assert!(res.poll(&cancel).await.unwrap());
        assert_eq!(res.content_type(), Some("text/csv"));
        assert_eq!(fake.reads(), 0);
    }

    #[tokio::test]
    async fn missing_object_fails_poll() {
        let fake = Arc::new(FakeObjectStore::new());
        let mut res = resource(&fake, "b/absent");

        let err = res.poll(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            PollError::ObjectStore(ObjectStoreError::NotFound { .. })
        ));
        assert_eq!(res.fingerprint(), ObjectFingerprint::default());
    }

    #[tokio::test]
    async fn cancelled_poll_returns_cancelled() {
        let fake = Arc::new(FakeObjectStore::new());
        fake.put("b", "k", "text/plain", b"x");
        let mut res = resource(&fake, "b/k");
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(res.poll(&cancel).await, Err(PollError::Cancelled)));
    }

    #[tokio::test]
    async fn refresh_delivers_object_bytes() {
        let fake = Arc::new(FakeObjectStore::new());
        fake.put("b", "k", "text/plain", b"hello object");
        let res = resource(&fake, "b/k");
        let handler = RecordingHandler::new();

        res.refresh(&CancellationToken::new(), &handler).await;

        assert_eq!(handler.data(), vec![b"hello object".to_vec()]);
        assert!(handler.errors().is_empty());
    }

    #[tokio::test]
    async fn refresh_of_missing_object_reports_error_only() {
        let fake = Arc::new(FakeObjectStore::new());
        let res = resource(&fake, "b/absent");
        let handler = RecordingHandler::new();

        res.refresh(&CancellationToken::new(), &handler).await;

        assert!(handler.data().is_empty());
        assert_eq!(handler.errors().len(), 1);
    }

    #[tokio::test]
    async fn release_failure_is_reported_after_data() {
        let fake = Arc::new(FakeObjectStore::new());
        fake.put("b", "k", "text/plain", b"payload");
        fake.fail_close(true);
        let res = resource(&fake, "b/k");
        let handler = RecordingHandler::new();

        res.refresh(&CancellationToken::new(), &handler).await;

        assert_eq!(handler.data(), vec![b"payload".to_vec()]);
        assert_eq!(handler.errors().len(), 1);
        assert!(handler.errors()[0].starts_with("failed to release fetch handle"));
    }

    #[tokio::test]
    async fn lazy_client_failure_surfaces_through_poll_and_refresh() {
        let store = SharedObjectStore::lazy(|| async {
            Err(ObjectStoreError::Init("no credentials".into()))
        });
        let mut res = ObjectStoreResource::new(store, "b", "k");
        let handler = RecordingHandler::new();
        let cancel = CancellationToken::new();

        assert!(matches!(
            res.poll(&cancel).await,
            Err(PollError::ObjectStore(ObjectStoreError::Init(_)))
        ));
        res.refresh(&cancel, &handler).await;
        assert_eq!(handler.errors().len(), 1);
        assert!(handler.data().is_empty());
    }
}
