//! Local file resources.

use crate::error::{FactoryError, PollError, RefreshError};
use crate::resource::{Resource, UpdateHandler};
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// Version fingerprint of a file: last modification time and size.
///
/// `modified` is `None` on platforms that do not report modification times, in
/// which case only the size is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Size in bytes.
    pub len: u64,
}

impl From<&Metadata> for FileFingerprint {
    fn from(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

/// A file on the local filesystem.
///
/// Changes are detected by comparing the file's modification time and size
/// against the values captured at the last successful poll.
///
/// ```no_run
/// # async fn demo() -> Result<(), sprout_resource::FactoryError> {
/// use sprout_resource::file::FileResource;
///
/// // The fingerprint is captured here, so the first poll reports no change
/// // unless the file is touched in between.
/// let resource = FileResource::new("./settings.json").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
    fingerprint: FileFingerprint,
}

impl FileResource {
    /// Creates a resource for `path`, capturing its current fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Stat`] if the file cannot be inspected.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, FactoryError> {
        let path = path.into();
        let fingerprint = match stat(&path).await {
            Ok(fingerprint) => fingerprint,
            Err(source) => return Err(FactoryError::Stat { path, source }),
        };
        Ok(Self { path, fingerprint })
    }

    /// Creates a resource with an explicit starting fingerprint.
    ///
    /// Passing [`FileFingerprint::default()`] makes the first successful poll
    /// report a change, which is useful to deliver the initial content.
    #[must_use]
    pub fn with_fingerprint(path: impl Into<PathBuf>, fingerprint: FileFingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }

    /// The watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint recorded by the last successful poll (or construction).
    #[must_use]
    pub fn fingerprint(&self) -> FileFingerprint {
        self.fingerprint
    }
}

async fn stat(path: &Path) -> std::io::Result<FileFingerprint> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(FileFingerprint::from(&metadata))
}

#[async_trait]
impl Resource for FileResource {
    async fn poll(&mut self, _cancel: &CancellationToken) -> Result<bool, PollError> {
        let current = stat(&self.path).await.map_err(|source| PollError::Stat {
            path: self.path.clone(),
            source,
        })?;

        if current == self.fingerprint {
            return Ok(false);
        }

        tracing::debug!(
            path = %self.path.display(),
            len = current.len,
            "file fingerprint changed"
        );
        self.fingerprint = current;
        Ok(true)
    }

    async fn refresh(&self, _cancel: &CancellationToken, handler: &dyn UpdateHandler) {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(source) => {
                handler
                    .on_error(RefreshError::Open {
                        path: self.path.clone(),
                        source,
                    })
                    .await;
                return;
            }
        };

        handler.on_data(&mut file).await;
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHandler;
    use std::io::Write;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn fresh_resource_reports_unchanged() {
        let file = temp_file("test");
        let mut resource = FileResource::new(file.path()).await.unwrap();

        let changed = resource.poll(&CancellationToken::new()).await.unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn size_change_is_reported_once() {
        let mut file = temp_file("test");
        let mut resource = FileResource::new(file.path()).await.unwrap();
        let cancel = CancellationToken::new();

        file.write_all(b" and more").unwrap();
        file.flush().unwrap();

        assert!(resource.poll(&cancel).await.unwrap());
        assert_eq!(resource.fingerprint().len, 13);
        assert!(!resource.poll(&cancel).await.unwrap());
    }

    #[tokio::test]
    async fn default_fingerprint_reports_change() {
        let file = temp_file("");
        let mut resource = FileResource::with_fingerprint(file.path(), FileFingerprint::default());

        assert!(resource.poll(&CancellationToken::new()).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileResource::new(dir.path().join("absent")).await;
        assert!(matches!(result, Err(FactoryError::Stat { .. })));
    }

    #[tokio::test]
    async fn deleted_file_fails_poll_and_keeps_fingerprint() {
        let file = temp_file("gone soon");
        let path = file.path().to_path_buf();
        let mut resource = FileResource::new(&path).await.unwrap();
        let before = resource.fingerprint();
        drop(file);

        let result = resource.poll(&CancellationToken::new()).await;
        assert!(matches!(result, Err(PollError::Stat { .. })));
        assert_eq!(resource.fingerprint(), before);
    }

    #[tokio::test]
    async fn refresh_delivers_current_bytes() {
        let file = temp_file("this is a test");
        let resource = FileResource::new(file.path()).await.unwrap();
        let handler = RecordingHandler::new();

        resource.refresh(&CancellationToken::new(), &handler).await;

        assert_eq!(handler.data(), vec![b"this is a test".to_vec()]);
        assert!(handler.errors().is_empty());
    }

    #[tokio::test]
    async fn refresh_of_missing_file_reports_error_only() {
        let dir = tempfile::tempdir().unwrap();
        let resource =
            FileResource::with_fingerprint(dir.path().join("absent"), FileFingerprint::default());
        let handler = RecordingHandler::new();

        resource.refresh(&CancellationToken::new(), &handler).await;

        assert!(handler.data().is_empty());
        assert_eq!(handler.errors().len(), 1);
        assert!(handler.errors()[0].starts_with("failed to open"));
    }

    #[test]
    fn describe_uses_file_scheme() {
        let resource = FileResource::with_fingerprint("/etc/hosts", FileFingerprint::default());
        assert_eq!(resource.describe(), "file:///etc/hosts");
    }
}
