use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::http::{header, HeaderMap};
use tracing::info;
use uuid::Uuid;

use super::model::Video;
use super::MULTIPART_SLACK;
use crate::common::error::AppError;
use crate::media::pipeline::IncomingUpload;
use crate::state::AppState;

pub const VIDEO_FIELD: &str = "video";
pub const THUMBNAIL_FIELD: &str = "thumbnail";

pub struct VideoService;

impl VideoService {
    pub fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("invalid video id".to_string()))
    }

    /// Upper bound for the file part derived from the request's
    /// `Content-Length`, or `None` when the header is absent.
    pub fn declared_file_size(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|length| length.saturating_sub(MULTIPART_SLACK))
    }

    /// Loads the record and checks that `user_id` owns it. Runs before
    /// anything is written for the request.
    pub async fn authorize_owner(
        state: &AppState,
        video_id: Uuid,
        user_id: Uuid,
    ) -> Result<Video, AppError> {
        let video = state
            .videos
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound("video not found".to_string()))?;

        if video.user_id != user_id {
            return Err(AppError::Forbidden("not the owner of this video".to_string()));
        }
        Ok(video)
    }

    pub async fn get_video(state: &AppState, raw_id: &str, user_id: Uuid) -> Result<Video, AppError> {
        let video_id = Self::parse_video_id(raw_id)?;
        Self::authorize_owner(state, video_id, user_id).await
    }

    pub async fn upload_video(
        state: &AppState,
        raw_id: &str,
        user_id: Uuid,
        declared_size: Option<u64>,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Video, AppError> {
        let video_id = Self::parse_video_id(raw_id)?;
        let video = Self::authorize_owner(state, video_id, user_id).await?;
        let mut multipart = multipart.map_err(malformed)?;

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            if field.name() != Some(VIDEO_FIELD) {
                continue;
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            info!(%video_id, %user_id, content_type = %content_type, "📼 Starting video upload");

            let upload = IncomingUpload {
                body: field,
                content_type,
                declared_size,
            };
            return state.pipeline.publish_video(video, upload).await;
        }

        Err(missing_field(VIDEO_FIELD))
    }

    pub async fn upload_thumbnail(
        state: &AppState,
        raw_id: &str,
        user_id: Uuid,
        declared_size: Option<u64>,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Video, AppError> {
        let video_id = Self::parse_video_id(raw_id)?;
        let video = Self::authorize_owner(state, video_id, user_id).await?;
        let mut multipart = multipart.map_err(malformed)?;

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            if field.name() != Some(THUMBNAIL_FIELD) {
                continue;
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            info!(%video_id, %user_id, content_type = %content_type, "🖼️ Starting thumbnail upload");

            let upload = IncomingUpload {
                body: field,
                content_type,
                declared_size,
            };
            return state.pipeline.publish_thumbnail(video, upload).await;
        }

        Err(missing_field(THUMBNAIL_FIELD))
    }
}

fn malformed(err: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("malformed multipart body: {err}"))
}

fn missing_field(name: &str) -> AppError {
    AppError::BadRequest(format!("no \"{name}\" field found in multipart request"))
}
