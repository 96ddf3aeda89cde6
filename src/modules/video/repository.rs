use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::Video;
use crate::infrastructure::db::pool::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("video {0} no longer exists")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Video metadata records.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError>;

    /// Sets only `video_url`, so a concurrent thumbnail commit is kept.
    async fn set_video_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError>;

    /// Sets only `thumbnail_url`.
    async fn set_thumbnail_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError>;
}

pub struct PgVideoRepository {
    pool: DbPool,
}

impl PgVideoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    async fn set_video_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError> {
        let updated = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET video_url = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at
            "#,
        )
        .bind(url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(updated)
    }

    async fn set_thumbnail_url(&self, id: Uuid, url: &str) -> Result<Video, RepositoryError> {
        let updated = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET thumbnail_url = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at
            "#,
        )
        .bind(url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound(id))?;

        Ok(updated)
    }
}
