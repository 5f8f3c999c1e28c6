//! Test doubles for resources, handlers and object stores.
//!
//! Available under `cfg(test)` and the `test-utils` feature.

use crate::error::{ObjectStoreError, PollError, RefreshError};
use crate::object_store::{ObjectMetadata, ObjectReader, ObjectStoreClient};
use crate::resource::{DataStream, Resource, UpdateHandler};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// RecordingHandler
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorded {
    data: Mutex<Vec<Vec<u8>>>,
    errors: Mutex<Vec<String>>,
    notify: Notify,
}

/// [`UpdateHandler`] that records every delivery.
///
/// Clones share the same record, so a clone can be moved into a watch while
/// the test keeps another to inspect.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    recorded: Arc<Recorded>,
}

impl RecordingHandler {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads delivered through `on_data`, in order.
    #[must_use]
    pub fn data(&self) -> Vec<Vec<u8>> {
        self.recorded.data.lock().unwrap().clone()
    }

    /// Errors delivered through `on_error`, rendered with `Display`.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.recorded.errors.lock().unwrap().clone()
    }

    /// Number of `on_data` calls so far.
    #[must_use]
    pub fn data_count(&self) -> usize {
        self.recorded.data.lock().unwrap().len()
    }

    /// Waits until at least `count` payloads have been delivered.
    pub async fn wait_for_data(&self, count: usize) {
        loop {
            let notified = self.recorded.notify.notified();
            if self.data_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Waits until at least `count` errors have been delivered.
    pub async fn wait_for_errors(&self, count: usize) {
        loop {
            let notified = self.recorded.notify.notified();
            if self.recorded.errors.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl UpdateHandler for RecordingHandler {
    async fn on_data(&self, data: DataStream<'_>) {
        let mut buf = Vec::new();
        match data.read_to_end(&mut buf).await {
            Ok(_) => self.recorded.data.lock().unwrap().push(buf),
            Err(err) => self
                .recorded
                .errors
                .lock()
                .unwrap()
                .push(RefreshError::Read(err).to_string()),
        }
        self.recorded.notify.notify_waiters();
    }

    async fn on_error(&self, error: RefreshError) {
        self.recorded.errors.lock().unwrap().push(error.to_string());
        self.recorded.notify.notify_waiters();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptedResource
// ─────────────────────────────────────────────────────────────────────────────

/// Call counters shared between a [`ScriptedResource`] and the test.
#[derive(Clone, Default)]
pub struct ResourceStats {
    polls: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl ResourceStats {
    /// Number of `poll` calls.
    #[must_use]
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Number of `refresh` calls.
    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

enum Step {
    Changed,
    Unchanged,
    Fail(String),
}

/// In-memory [`Resource`] whose poll outcomes follow a script.
///
/// Once the script is exhausted every poll reports "unchanged".
pub struct ScriptedResource {
    script: Mutex<VecDeque<Step>>,
    payload: Vec<u8>,
    refresh_delay: Option<Duration>,
    refresh_error: Option<String>,
    stats: ResourceStats,
}

impl ScriptedResource {
    /// Creates a resource delivering `payload` on refresh.
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            payload: payload.into(),
            refresh_delay: None,
            refresh_error: None,
            stats: ResourceStats::default(),
        }
    }

    /// Appends a poll reporting a change.
    #[must_use]
    pub fn then_changed(self) -> Self {
        self.push(Step::Changed)
    }

    /// Appends a poll reporting no change.
    #[must_use]
    pub fn then_unchanged(self) -> Self {
        self.push(Step::Unchanged)
    }

    /// Appends a failing poll.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    /// Makes every refresh take `delay` before delivering.
    #[must_use]
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    /// Makes every refresh fail with `message` instead of delivering data.
    #[must_use]
    pub fn with_refresh_error(mut self, message: impl Into<String>) -> Self {
        self.refresh_error = Some(message.into());
        self
    }

    /// Counters that stay readable after the resource is moved into a watch.
    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        self.stats.clone()
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }
}

#[async_trait]
impl Resource for ScriptedResource {
    async fn poll(&mut self, _cancel: &CancellationToken) -> Result<bool, PollError> {
        self.stats.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Changed) => Ok(true),
            Some(Step::Unchanged) | None => Ok(false),
            Some(Step::Fail(message)) => Err(PollError::other(message)),
        }
    }

    async fn refresh(&self, _cancel: &CancellationToken, handler: &dyn UpdateHandler) {
        self.stats.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.refresh_error {
            Some(message) => handler.on_error(RefreshError::other(message.clone())).await,
            None => handler.on_data(&mut self.payload.as_slice()).await,
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FakeObjectStore
// ─────────────────────────────────────────────────────────────────────────────

struct FakeObject {
    data: Vec<u8>,
    generation: i64,
    metageneration: i64,
    content_type: String,
}

/// In-memory [`ObjectStoreClient`].
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<(String, String), FakeObject>>,
    fail_close: Mutex<bool>,
    metadata_calls: AtomicUsize,
    reads: AtomicUsize,
}

impl FakeObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an object, bumping its generation.
    pub fn put(&self, bucket: &str, key: &str, content_type: &str, data: &[u8]) {
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .entry((bucket.to_string(), key.to_string()))
            .or_insert_with(|| FakeObject {
                data: Vec::new(),
                generation: 0,
                metageneration: 0,
                content_type: String::new(),
            });
        object.data = data.to_vec();
        object.generation += 1;
        object.metageneration = 1;
        object.content_type = content_type.to_string();
    }

    /// Updates an object's metadata only, bumping its metageneration.
    pub fn touch_metadata(&self, bucket: &str, key: &str, content_type: &str) {
        let mut objects = self.objects.lock().unwrap();
        if let Some(object) = objects.get_mut(&(bucket.to_string(), key.to_string())) {
            object.metageneration += 1;
            object.content_type = content_type.to_string();
        }
    }

    /// Deletes an object.
    pub fn remove(&self, bucket: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
    }

    /// Makes every reader fail when closed.
    pub fn fail_close(&self, fail: bool) {
        *self.fail_close.lock().unwrap() = fail;
    }

    /// Number of metadata requests served.
    #[must_use]
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Number of readers opened.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn not_found(bucket: &str, key: &str) -> ObjectStoreError {
        ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for FakeObjectStore {
    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| Self::not_found(bucket, key))?;
        Ok(ObjectMetadata {
            generation: object.generation,
            metageneration: object.metageneration,
            content_type: Some(object.content_type.clone()),
        })
    }

    async fn open_reader(&self, bucket: &str, key: &str) -> Result<ObjectReader, ObjectStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.data.clone())
            .ok_or_else(|| Self::not_found(bucket, key))?;

        let reader = ObjectReader::new(std::io::Cursor::new(data));
        if *self.fail_close.lock().unwrap() {
            Ok(reader.with_close(|| Err(ObjectStoreError::Http("connection reset".into()))))
        } else {
            Ok(reader)
        }
    }
}
