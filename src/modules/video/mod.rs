use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

/// Room for multipart boundaries and part headers on top of the file itself.
pub const MULTIPART_SLACK: u64 = 64 * 1024;

fn body_limit(max_file_bytes: u64) -> DefaultBodyLimit {
    let limit = max_file_bytes.saturating_add(MULTIPART_SLACK);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

pub fn router(state: AppState) -> Router<AppState> {
    let video_limit = body_limit(state.config.max_video_bytes);
    let thumbnail_limit = body_limit(state.config.max_thumbnail_bytes);

    Router::new()
        .route(
            "/videos/{video_id}",
            post(handler::upload_video)
                .layer(video_limit)
                .get(handler::get_video),
        )
        .route(
            "/thumbnails/{video_id}",
            post(handler::upload_thumbnail).layer(thumbnail_limit),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
