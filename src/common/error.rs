use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::common::response::ApiError;
use crate::infrastructure::storage::StorageError;
use crate::media::probe::ProbeError;
use crate::media::staging::StagingError;
use crate::media::tool::ToolError;
use crate::media::UnprocessableMedia;
use crate::modules::video::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("unprocessable media: {0}")]
    UnprocessableMedia(#[from] UnprocessableMedia),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable machine-readable error kind, echoed in the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Staging(StagingError::Io(_)) => "internal",
            AppError::Staging(_) => "bad_request",
            AppError::Tool(_) => "tool_failure",
            AppError::UnprocessableMedia(_) => "unprocessable_media",
            AppError::Storage(_) => "storage_failure",
            AppError::Repository(RepositoryError::NotFound(_)) => "not_found",
            AppError::Repository(_) | AppError::Io(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Staging(StagingError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Staging(_) => StatusCode::BAD_REQUEST,
            AppError::Tool(ToolError::Failed { .. }) => StatusCode::BAD_REQUEST,
            AppError::Tool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnprocessableMedia(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Repository(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the whole `BadRequest` family: malformed ids, disallowed
    /// media types and oversized payloads.
    pub fn is_bad_request(&self) -> bool {
        self.kind() == "bad_request"
    }

    /// Message safe to return to the client. Captured stderr and backend
    /// detail stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Tool(err) => format!("{} failed to process the upload", err.tool()),
            AppError::Storage(_) => "failed to publish the upload".to_string(),
            AppError::Repository(RepositoryError::NotFound(_)) => "video not found".to_string(),
            AppError::Staging(StagingError::Io(_)) | AppError::Repository(_) | AppError::Io(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ProbeError> for AppError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Tool(e) => AppError::Tool(e),
            ProbeError::Unprocessable(e) => AppError::UnprocessableMedia(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        } else if let AppError::Tool(err) = &self {
            warn!(kind = self.kind(), error = %err, "media tool rejected upload");
        }

        ApiError(self.client_message(), status, self.kind()).into_response()
    }
}
