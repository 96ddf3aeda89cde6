//! Tubely: authenticated video and thumbnail uploads, inspected with
//! `ffprobe`, remuxed for fast start with `ffmpeg` and published to S3.

pub mod app;
pub mod common;
pub mod config;
pub mod docs;
pub mod infrastructure;
pub mod media;
pub mod middleware;
pub mod modules;
pub mod routes;
pub mod state;
pub mod workers;
