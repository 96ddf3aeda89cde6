use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::ids::random_id;
use super::orientation::Orientation;
use crate::infrastructure::storage::{ObjectStore, StorageError};

/// `<orientation>/<random id>.<ext>`
pub fn video_key(orientation: Orientation, ext: &str) -> String {
    format!("{}/{}.{}", orientation, random_id(), ext)
}

/// `<random id>.<ext>`, for assets without a partition prefix.
pub fn asset_key(ext: &str) -> String {
    format!("{}.{}", random_id(), ext)
}

/// Uploads finished files and hands back their public URL.
#[derive(Clone)]
pub struct ObjectPublisher {
    store: Arc<dyn ObjectStore>,
}

impl ObjectPublisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Single put of `path` under `key`. The URL is only produced once the
    /// store has confirmed the write.
    pub async fn publish(&self, path: &Path, key: &str, content_type: &str) -> Result<String, StorageError> {
        self.store.put_file(key, path, content_type).await?;
        let url = self.store.public_url(key);
        info!(key, "object published");
        Ok(url)
    }
}
