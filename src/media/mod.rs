//! Video ingest pipeline: staging, external tool orchestration, orientation
//! classification, fast-start remux and publishing.

pub mod faststart;
pub mod ids;
pub mod orientation;
pub mod orphans;
pub mod pipeline;
pub mod probe;
pub mod publish;
pub mod staging;
pub mod tool;

use thiserror::Error;

/// Inspection succeeded but the media cannot be used (missing or
/// non-positive dimensions, unreadable probe output).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UnprocessableMedia(pub String);
