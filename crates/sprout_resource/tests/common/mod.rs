//! Shared helpers for `sprout_resource` integration tests.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities; not every item is used by every test binary"
)]

use async_trait::async_trait;
use sprout_resource::{DataStream, RefreshError, UpdateHandler};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tokio::io::AsyncReadExt;

// ─────────────────────────────────────────────────────────────────────────────
// Files
// ─────────────────────────────────────────────────────────────────────────────

/// Creates a file with `content` inside `dir`.
pub fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Appends `content` to the file at `path`.
pub fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Collects delivered payloads as strings and errors as messages.
#[derive(Default)]
pub struct Collector {
    pub data: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

#[async_trait]
impl UpdateHandler for Collector {
    async fn on_data(&self, data: DataStream<'_>) {
        let mut text = String::new();
        data.read_to_string(&mut text).await.unwrap();
        self.data.lock().unwrap().push(text);
    }

    async fn on_error(&self, error: RefreshError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}
