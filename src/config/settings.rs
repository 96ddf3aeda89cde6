use std::path::PathBuf;
use std::time::Duration;
use crate::config::env::{self, EnvKey};

pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 1 << 30;
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub assets_root: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_public_base_url: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub tool_timeout_secs: u64,
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub staging_grace_secs: u64,
    pub janitor_interval_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 8091),
            database_url: env::get(EnvKey::DatabaseUrl)?,
            jwt_secret: env::get(EnvKey::JwtSecret)?,
            assets_root: PathBuf::from(env::get_or(EnvKey::AssetsRoot, "./assets")),
            s3_bucket: env::get(EnvKey::S3Bucket)?,
            s3_region: env::get_or(EnvKey::S3Region, "us-east-1"),
            s3_endpoint: env::get_opt(EnvKey::S3Endpoint),
            s3_public_base_url: env::get_opt(EnvKey::S3PublicBaseUrl),
            aws_access_key: env::get_opt(EnvKey::AwsAccessKey),
            aws_secret_key: env::get_opt(EnvKey::AwsSecretKey),
            ffprobe_path: env::get_or(EnvKey::FfprobePath, "ffprobe"),
            ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
            tool_timeout_secs: env::get_parsed(EnvKey::ToolTimeoutSecs, 300),
            max_video_bytes: env::get_parsed(EnvKey::MaxVideoBytes, DEFAULT_MAX_VIDEO_BYTES),
            max_thumbnail_bytes: env::get_parsed(
                EnvKey::MaxThumbnailBytes,
                DEFAULT_MAX_THUMBNAIL_BYTES,
            ),
            staging_grace_secs: env::get_parsed(EnvKey::StagingGraceSecs, 3600),
            janitor_interval_secs: env::get_parsed(EnvKey::JanitorIntervalSecs, 600),
        })
    }

    /// Scratch area for files mid-pipeline.
    pub fn staging_dir(&self) -> PathBuf {
        self.assets_root.join("tmp")
    }

    pub fn orphan_ledger_path(&self) -> PathBuf {
        self.assets_root.join("orphans.jsonl")
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn staging_grace(&self) -> Duration {
        Duration::from_secs(self.staging_grace_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }
}
