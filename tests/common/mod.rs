#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use uuid::Uuid;

use tubely::config::settings::AppConfig;
use tubely::infrastructure::storage::{ObjectStore, StorageError};
use tubely::media::pipeline::{IncomingUpload, PublishOrchestrator};
use tubely::modules::video::model::Video;
use tubely::modules::video::repository::{RepositoryError, VideoRepository};
use tubely::state::AppState;

pub const JWT_SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store. `fail_puts` makes every put fail.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    pub fail_puts: AtomicBool,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed {
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let body = tokio::fs::read(path).await.map_err(|e| StorageError::ReadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://tubely-test.s3.us-east-1.amazonaws.com/{key}")
    }
}

/// In-memory record store. `fail_updates` makes every update fail.
#[derive(Default)]
pub struct MemoryVideos {
    records: Mutex<HashMap<Uuid, Video>>,
    pub fail_updates: AtomicBool,
    pub updates: AtomicUsize,
}

impl MemoryVideos {
    pub fn insert(&self, video: Video) {
        self.records.lock().unwrap().insert(video.id, video);
    }

    pub fn record(&self, id: Uuid) -> Option<Video> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    fn update_with(&self, id: Uuid, change: impl FnOnce(&mut Video)) -> Result<Video, RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("injected failure".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        let existing = records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        change(existing);
        existing.updated_at = OffsetDateTime::now_utc();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(existing.clone())
    }
}

#[async_trait]
impl VideoRepository for MemoryVideos {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        Ok(self.record(id))
    }

    async fn set_video_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError> {
        self.update_with(id, |video| video.video_url = Some(url.to_string()))
    }

    async fn set_thumbnail_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError> {
        self.update_with(id, |video| video.thumbnail_url = Some(url.to_string()))
    }
}

pub fn sample_video(owner: Uuid) -> Video {
    let now = OffsetDateTime::now_utc();
    Video {
        id: Uuid::new_v4(),
        user_id: owner,
        title: "Boots".to_string(),
        description: Some("a pair of boots".to_string()),
        thumbnail_url: None,
        video_url: None,
        created_at: now,
        updated_at: now,
    }
}

/// Writes an executable `sh` script standing in for a media tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
pub fn fake_ffprobe(dir: &Path, width: i64, height: i64) -> PathBuf {
    write_script(
        dir,
        "ffprobe",
        &format!(r#"echo '{{"streams":[{{"width":{width},"height":{height}}}]}}'"#),
    )
}

/// Copies the input (`$2`) to the output (last argument).
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path) -> PathBuf {
    write_script(dir, "ffmpeg", r#"for last; do :; done; cp "$2" "$last""#)
}

pub struct Harness {
    pub root: tempfile::TempDir,
    pub config: AppConfig,
    pub store: Arc<MemoryStore>,
    pub videos: Arc<MemoryVideos>,
    pub pipeline: PublishOrchestrator,
}

impl Harness {
    pub fn new(ffprobe: &Path, ffmpeg: &Path, root: tempfile::TempDir) -> Self {
        let config = test_config(root.path(), ffprobe, ffmpeg);
        let store = Arc::new(MemoryStore::default());
        let videos = Arc::new(MemoryVideos::default());
        let pipeline = PublishOrchestrator::from_config(&config, store.clone(), videos.clone());
        Self {
            root,
            config,
            store,
            videos,
            pipeline,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.config.clone(), self.videos.clone(), self.store.clone())
    }

    pub fn staged_files(&self) -> usize {
        count_files(&self.config.staging_dir())
    }
}

pub fn test_config(root: &Path, ffprobe: &Path, ffmpeg: &Path) -> AppConfig {
    AppConfig {
        server_port: 0,
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        assets_root: root.join("assets"),
        s3_bucket: "tubely-test".to_string(),
        s3_region: "us-east-1".to_string(),
        s3_endpoint: None,
        s3_public_base_url: None,
        aws_access_key: None,
        aws_secret_key: None,
        ffprobe_path: ffprobe.to_string_lossy().into_owned(),
        ffmpeg_path: ffmpeg.to_string_lossy().into_owned(),
        tool_timeout_secs: 30,
        max_video_bytes: 1024 * 1024,
        max_thumbnail_bytes: 64 * 1024,
        staging_grace_secs: 3600,
        janitor_interval_secs: 0,
    }
}

pub fn count_files(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).filter(|e| e.path().is_file()).count(),
        Err(_) => 0,
    }
}

pub fn body(
    chunks: Vec<Result<Bytes, std::io::Error>>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
    stream::iter(chunks)
}

pub fn upload(
    content_type: &str,
    data: &[u8],
) -> IncomingUpload<impl Stream<Item = Result<Bytes, std::io::Error>> + Send> {
    IncomingUpload {
        body: body(vec![Ok(Bytes::copy_from_slice(data))]),
        content_type: content_type.to_string(),
        declared_size: Some(data.len() as u64),
    }
}
