use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    JwtSecret,
    AssetsRoot,
    S3Bucket,
    S3Region,
    S3Endpoint,
    S3PublicBaseUrl,
    AwsAccessKey,
    AwsSecretKey,
    FfprobePath,
    FfmpegPath,
    ToolTimeoutSecs,
    MaxVideoBytes,
    MaxThumbnailBytes,
    StagingGraceSecs,
    JanitorIntervalSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::JwtSecret => "JWT_SECRET",
            EnvKey::AssetsRoot => "ASSETS_ROOT",
            EnvKey::S3Bucket => "S3_BUCKET",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::S3PublicBaseUrl => "S3_PUBLIC_BASE_URL",
            EnvKey::AwsAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::FfprobePath => "FFPROBE_PATH",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::ToolTimeoutSecs => "TOOL_TIMEOUT_SECS",
            EnvKey::MaxVideoBytes => "MAX_VIDEO_BYTES",
            EnvKey::MaxThumbnailBytes => "MAX_THUMBNAIL_BYTES",
            EnvKey::StagingGraceSecs => "STAGING_GRACE_SECS",
            EnvKey::JanitorIntervalSecs => "JANITOR_INTERVAL_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

/// Returns `None` for unset and empty variables alike.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
