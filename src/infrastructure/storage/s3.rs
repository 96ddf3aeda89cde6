use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::BehaviorVersion, config::Credentials, config::Region, Client};
use std::path::Path;
use tracing::{info, warn};

use super::{ObjectStore, StorageError};
use crate::config::settings::AppConfig;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    pub region: String,
    pub public_base_url: Option<String>,
}

impl StorageService {
    pub fn new(config: &AppConfig) -> Self {
        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()));

        if let Some(endpoint) = &config.s3_endpoint {
            // MinIO and other S3-compatible stores
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        match (&config.aws_access_key, &config.aws_secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");
                builder = builder.credentials_provider(credentials);
            }
            _ => warn!("No static S3 credentials configured, requests will be unsigned"),
        }

        let client = Client::from_conf(builder.build());

        info!("✅ S3 client ready for bucket {}", config.s3_bucket);

        Self {
            client,
            bucket: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
            public_base_url: config.s3_public_base_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::ReadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, &self.region, self.public_base_url.as_deref(), key)
    }
}

/// `https://<bucket>.s3.<region>.amazonaws.com/<key>`, or `<base>/<key>` when a
/// CDN or MinIO base URL is configured.
pub fn public_url(bucket: &str, region: &str, public_base_url: Option<&str>, key: &str) -> String {
    match public_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}
