use crate::common::response::{ApiResponse, ApiSuccess};
use crate::middleware::auth::TokenClaims;
use crate::modules::video::model::Video;
use crate::modules::video::service::VideoService;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

#[utoipa::path(
    get,
    path = "/api/videos/{video_id}",
    params(
        ("video_id" = Uuid, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video record", body = ApiResponse<Video>),
        (status = 400, description = "Invalid video id"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Video not found")
    ),
    tag = "Videos",
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(video_id): Path<String>,
) -> impl IntoResponse {
    match VideoService::get_video(&state, &video_id, claims.sub).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Video retrieved successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Upload Video
/// Stages the file, checks its dimensions, remuxes it for fast start and
/// publishes it under an orientation prefix.
#[utoipa::path(
    post,
    path = "/api/videos/{video_id}",
    params(
        ("video_id" = Uuid, Path, description = "Video ID")
    ),
    request_body(content = String, content_type = "multipart/form-data", description = "Form field `video` with an MP4 file"),
    responses(
        (status = 200, description = "Upload successful", body = ApiResponse<Video>),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Video not found"),
        (status = 422, description = "Unprocessable media"),
        (status = 500, description = "Internal Server Error"),
        (status = 502, description = "Object storage failure")
    ),
    tag = "Videos",
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let declared_size = VideoService::declared_file_size(&headers);
    match VideoService::upload_video(&state, &video_id, claims.sub, declared_size, multipart).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Video uploaded successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Upload Thumbnail
#[utoipa::path(
    post,
    path = "/api/thumbnails/{video_id}",
    params(
        ("video_id" = Uuid, Path, description = "Video ID")
    ),
    request_body(content = String, content_type = "multipart/form-data", description = "Form field `thumbnail` with a JPEG, PNG, WebP or GIF image"),
    responses(
        (status = 200, description = "Upload successful", body = ApiResponse<Video>),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Internal Server Error"),
        (status = 502, description = "Object storage failure")
    ),
    tag = "Videos",
    security(("bearer_auth" = []))
)]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let declared_size = VideoService::declared_file_size(&headers);
    match VideoService::upload_thumbnail(&state, &video_id, claims.sub, declared_size, multipart).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Thumbnail uploaded successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}
