pub mod s3;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path} for upload: {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error("upload of {key} failed: {message}")]
    UploadFailed { key: String, message: String },
}

/// Durable object storage. A successful `put_file` means the object is
/// fully written under `key`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<(), StorageError>;

    /// Public address of `key`. Deterministic, never touches the network.
    fn public_url(&self, key: &str) -> String;
}
