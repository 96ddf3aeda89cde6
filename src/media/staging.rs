use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use mime::Mime;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::ids::random_id;

pub const VIDEO_TYPES: &[(&str, &str)] = &[("video/mp4", "mp4")];

pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("file size exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("unsupported media type {received:?}, allowed: {allowed}")]
    UnsupportedMediaType { received: String, allowed: String },

    #[error("upload stream interrupted: {0}")]
    Interrupted(String),

    #[error("staging io error: {0}")]
    Io(#[from] io::Error),
}

/// Size ceiling plus the MIME allowlist for one class of upload. Each
/// allowed type maps to the extension used on disk and in object keys.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed: &'static [(&'static str, &'static str)],
}

impl UploadPolicy {
    pub fn video(max_bytes: u64) -> Self {
        Self { max_bytes, allowed: VIDEO_TYPES }
    }

    pub fn thumbnail(max_bytes: u64) -> Self {
        Self { max_bytes, allowed: IMAGE_TYPES }
    }

    /// Resolves a declared content type to its canonical MIME type and
    /// extension. Parameters such as `; charset=...` are ignored and the
    /// comparison is case-insensitive.
    pub fn resolve(&self, content_type: &str) -> Result<(&'static str, &'static str), StagingError> {
        let normalized = normalize_mime_type(content_type);
        self.allowed
            .iter()
            .find(|(mime, _)| *mime == normalized)
            .copied()
            .ok_or_else(|| StagingError::UnsupportedMediaType {
                received: content_type.to_string(),
                allowed: self
                    .allowed
                    .iter()
                    .map(|(mime, _)| *mime)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    pub fn check_size(&self, size: u64) -> Result<(), StagingError> {
        if size > self.max_bytes {
            return Err(StagingError::PayloadTooLarge { limit: self.max_bytes });
        }
        Ok(())
    }
}

fn normalize_mime_type(content_type: &str) -> String {
    match content_type.trim().parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => content_type.trim().to_ascii_lowercase(),
    }
}

/// A temp file owned by one pipeline run.
///
/// `release` unlinks it; if the guard is dropped unreleased (panic, cancelled
/// request) the file is unlinked synchronously in `Drop`.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: u64,
    released: bool,
}

impl StagedFile {
    /// Takes ownership of a file some other stage created on disk.
    pub fn adopt(path: PathBuf, size: u64) -> Self {
        Self { path, size, released: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub(super) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Unlinks the file, logging instead of failing. Used on terminal states
    /// where the pipeline outcome is already decided.
    pub async fn release_logged(self) {
        let path = self.path.clone();
        if let Err(e) = self.release().await {
            warn!(path = %path.display(), error = %e, "failed to remove staged file");
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Writes incoming uploads into the staging directory under random names.
#[derive(Debug, Clone)]
pub struct StagingWriter {
    dir: PathBuf,
}

impl StagingWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Streams `body` to `<dir>/<random id>.<ext>`.
    ///
    /// Type and declared size are checked before anything touches the disk;
    /// the measured size is enforced chunk by chunk and an overrun removes the
    /// partial file.
    pub async fn stage<S, E>(
        &self,
        body: S,
        content_type: &str,
        declared_size: Option<u64>,
        policy: &UploadPolicy,
    ) -> Result<StagedFile, StagingError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let (_, ext) = policy.resolve(content_type)?;
        if let Some(declared) = declared_size {
            policy.check_size(declared)?;
        }

        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.{}", random_id(), ext));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let mut staged = StagedFile::adopt(path, 0);

        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = match chunk.map_err(|e| e.to_string()) {
                Ok(c) => c,
                Err(reason) => {
                    drop(file);
                    staged.release_logged().await;
                    return Err(StagingError::Interrupted(reason));
                }
            };

            staged.size += chunk.len() as u64;
            if let Err(e) = policy.check_size(staged.size) {
                drop(file);
                staged.release_logged().await;
                return Err(e);
            }

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                staged.release_logged().await;
                return Err(e.into());
            }
        }

        if let Err(e) = file.flush().await {
            drop(file);
            staged.release_logged().await;
            return Err(e.into());
        }

        debug!(path = %staged.path().display(), bytes = staged.size, "upload staged");
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        let owned: Vec<Result<Bytes, Infallible>> =
            parts.iter().map(|p| Ok(Bytes::from_static(*p))).collect();
        stream::iter(owned)
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn stages_into_created_directory() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));

        let staged = writer
            .stage(chunks(&[b"abc", b"def"]), "video/mp4", Some(6), &UploadPolicy::video(16))
            .await
            .unwrap();

        assert_eq!(staged.size(), 6);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"abcdef");
        assert_eq!(staged.path().parent().unwrap(), writer.dir());
        assert_eq!(staged.path().extension().unwrap(), "mp4");

        staged.release().await.unwrap();
        assert_eq!(entries(writer.dir()), 0);
    }

    #[tokio::test]
    async fn rejects_declared_oversize_without_touching_disk() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));

        let err = writer
            .stage(chunks(&[b"abc"]), "video/mp4", Some(17), &UploadPolicy::video(16))
            .await
            .unwrap_err();

        assert!(matches!(err, StagingError::PayloadTooLarge { limit: 16 }));
        assert!(!writer.dir().exists());
    }

    #[tokio::test]
    async fn measured_overrun_removes_partial_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));

        let err = writer
            .stage(chunks(&[b"0123456789", b"0123456789"]), "video/mp4", None, &UploadPolicy::video(16))
            .await
            .unwrap_err();

        assert!(matches!(err, StagingError::PayloadTooLarge { .. }));
        assert_eq!(entries(writer.dir()), 0);
    }

    #[tokio::test]
    async fn rejects_types_outside_allowlist() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));

        let err = writer
            .stage(chunks(&[b"abc"]), "video/quicktime", None, &UploadPolicy::video(16))
            .await
            .unwrap_err();

        assert!(matches!(err, StagingError::UnsupportedMediaType { .. }));
        assert!(!writer.dir().exists());
    }

    #[tokio::test]
    async fn interrupted_stream_removes_partial_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err("connection reset"),
        ]);

        let err = writer
            .stage(body, "video/mp4", None, &UploadPolicy::video(16))
            .await
            .unwrap_err();

        assert!(matches!(err, StagingError::Interrupted(_)));
        assert_eq!(entries(writer.dir()), 0);
    }

    #[tokio::test]
    async fn dropped_guard_unlinks_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(root.path().join("tmp"));

        let staged = writer
            .stage(chunks(&[b"abc"]), "image/png", None, &UploadPolicy::thumbnail(16))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);

        assert!(!path.exists());
    }

    #[test]
    fn mime_parameters_and_case_are_ignored() {
        let policy = UploadPolicy::thumbnail(1);
        assert_eq!(
            policy.resolve("IMAGE/JPEG; charset=binary").unwrap(),
            ("image/jpeg", "jpg")
        );
        assert_eq!(policy.resolve("image/webp").unwrap(), ("image/webp", "webp"));
        assert!(policy.resolve("image/svg+xml").is_err());
        assert!(policy.resolve("").is_err());
    }
}
