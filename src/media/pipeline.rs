//! Publish state machine for uploaded videos and thumbnails.
//!
//! ```text
//! Received -> Staged -> Probed -> Classified -> Transcoded -> Uploaded -> Committed
//!     \_________\_________\___________\____________\____________\______> Failed
//! ```
//!
//! Every temp file a run creates is owned by its [`UploadJob`] and released
//! when the run reaches `Committed` or `Failed`.

use bytes::Bytes;
use futures_util::Stream;
use std::fmt::Display;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::faststart::FastStartTranscoder;
use super::orientation::Orientation;
use super::orphans::{OrphanLedger, OrphanRecord};
use super::probe::{MediaProber, ProbeResult};
use super::publish::{asset_key, video_key, ObjectPublisher};
use super::staging::{StagedFile, StagingWriter, UploadPolicy};
use super::tool::ToolRunner;
use crate::common::error::AppError;
use crate::config::settings::AppConfig;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::video::model::Video;
use crate::modules::video::repository::VideoRepository;

/// Container produced by the fast-start remux.
const PUBLISHED_VIDEO_TYPE: &str = "video/mp4";
const PUBLISHED_VIDEO_EXT: &str = "mp4";

/// Which record column a commit writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetSlot {
    Video,
    Thumbnail,
}

/// Request body handed to the pipeline.
pub struct IncomingUpload<S> {
    pub body: S,
    pub content_type: String,
    pub declared_size: Option<u64>,
}

#[derive(Debug)]
pub enum PipelineState {
    Received,
    Staged,
    Probed(ProbeResult),
    Classified(Orientation),
    Transcoded,
    Uploaded,
    Committed(Video),
    Failed {
        at: &'static str,
        error: AppError,
    },
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::Staged => "staged",
            PipelineState::Probed(_) => "probed",
            PipelineState::Classified(_) => "classified",
            PipelineState::Transcoded => "transcoded",
            PipelineState::Uploaded => "uploaded",
            PipelineState::Committed(_) => "committed",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

/// Per-request state, mutated only by the orchestrator.
#[derive(Debug)]
pub struct UploadJob {
    video: Video,
    source: Option<StagedFile>,
    processed: Option<StagedFile>,
    orientation: Option<Orientation>,
    object_key: Option<String>,
    published_url: Option<String>,
}

impl UploadJob {
    fn new(video: Video) -> Self {
        Self {
            video,
            source: None,
            processed: None,
            orientation: None,
            object_key: None,
            published_url: None,
        }
    }

    fn video_id(&self) -> Uuid {
        self.video.id
    }

    /// The file the next stage works on: the remuxed copy once it exists.
    fn current(&self) -> Result<&StagedFile, AppError> {
        self.processed
            .as_ref()
            .or(self.source.as_ref())
            .ok_or_else(|| missing("staged file"))
    }

    async fn release(&mut self) {
        for file in [self.source.take(), self.processed.take()].into_iter().flatten() {
            file.release_logged().await;
        }
    }
}

fn missing(what: &str) -> AppError {
    AppError::Io(io::Error::other(format!("pipeline invariant violated: {what} missing")))
}

pub struct PublishOrchestrator {
    staging: StagingWriter,
    video_policy: UploadPolicy,
    thumbnail_policy: UploadPolicy,
    prober: MediaProber,
    transcoder: FastStartTranscoder,
    publisher: ObjectPublisher,
    records: Arc<dyn VideoRepository>,
    orphans: OrphanLedger,
}

impl PublishOrchestrator {
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn VideoRepository>,
    ) -> Self {
        let runner = ToolRunner::new(config.tool_timeout());
        Self {
            staging: StagingWriter::new(config.staging_dir()),
            video_policy: UploadPolicy::video(config.max_video_bytes),
            thumbnail_policy: UploadPolicy::thumbnail(config.max_thumbnail_bytes),
            prober: MediaProber::new(runner.clone(), config.ffprobe_path.clone()),
            transcoder: FastStartTranscoder::new(runner, config.ffmpeg_path.clone()),
            publisher: ObjectPublisher::new(store),
            records,
            orphans: OrphanLedger::new(config.orphan_ledger_path()),
        }
    }

    /// Runs an authorized video upload to a terminal state and returns the
    /// committed record.
    pub async fn publish_video<S, E>(
        &self,
        video: Video,
        upload: IncomingUpload<S>,
    ) -> Result<Video, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let mut job = UploadJob::new(video);
        let mut upload = Some(upload);
        let mut state = PipelineState::Received;

        loop {
            state = match state {
                PipelineState::Committed(video) => {
                    job.release().await;
                    info!(
                        video_id = %video.id,
                        key = job.object_key.as_deref().unwrap_or_default(),
                        "video published"
                    );
                    return Ok(video);
                }
                PipelineState::Failed { at, error } => {
                    job.release().await;
                    error!(video_id = %job.video_id(), at, kind = error.kind(), error = %error, "video upload failed");
                    return Err(error);
                }
                current => {
                    let at = current.name();
                    match self.advance(&mut job, current, &mut upload).await {
                        Ok(next) => {
                            debug!(video_id = %job.video_id(), from = at, to = next.name(), "pipeline transition");
                            next
                        }
                        Err(error) => PipelineState::Failed { at, error },
                    }
                }
            };
        }
    }

    async fn advance<S, E>(
        &self,
        job: &mut UploadJob,
        state: PipelineState,
        upload: &mut Option<IncomingUpload<S>>,
    ) -> Result<PipelineState, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        match state {
            PipelineState::Received => {
                let upload = upload.take().ok_or_else(|| missing("upload body"))?;
                let staged = self
                    .staging
                    .stage(
                        upload.body,
                        &upload.content_type,
                        upload.declared_size,
                        &self.video_policy,
                    )
                    .await?;
                job.source = Some(staged);
                Ok(PipelineState::Staged)
            }
            PipelineState::Staged => {
                let probe = self.prober.probe(job.current()?.path()).await?;
                Ok(PipelineState::Probed(probe))
            }
            PipelineState::Probed(probe) => {
                let orientation = Orientation::classify(probe.width, probe.height)?;
                job.orientation = Some(orientation);
                Ok(PipelineState::Classified(orientation))
            }
            PipelineState::Classified(_) => {
                let source = job.source.as_ref().ok_or_else(|| missing("source file"))?;
                let processed = self.transcoder.remux(source).await?;
                job.processed = Some(processed);
                // The remuxed copy is current from here on.
                if let Some(source) = job.source.take() {
                    source.release_logged().await;
                }
                Ok(PipelineState::Transcoded)
            }
            PipelineState::Transcoded => {
                let orientation = job.orientation.ok_or_else(|| missing("orientation"))?;
                let key = video_key(orientation, PUBLISHED_VIDEO_EXT);
                job.object_key = Some(key.clone());

                let processed = job.processed.as_ref().ok_or_else(|| missing("processed file"))?;
                let url = self
                    .publisher
                    .publish(processed.path(), &key, PUBLISHED_VIDEO_TYPE)
                    .await?;
                job.published_url = Some(url);
                Ok(PipelineState::Uploaded)
            }
            PipelineState::Uploaded => {
                let key = job.object_key.clone().ok_or_else(|| missing("object key"))?;
                let url = job.published_url.clone().ok_or_else(|| missing("published url"))?;
                let committed = self
                    .commit(job.video_id(), AssetSlot::Video, &key, &url)
                    .await?;
                Ok(PipelineState::Committed(committed))
            }
            terminal @ (PipelineState::Committed(_) | PipelineState::Failed { .. }) => Ok(terminal),
        }
    }

    /// Thumbnail variant: stage, publish under `<random id>.<ext>`, commit.
    /// No tool stage.
    pub async fn publish_thumbnail<S, E>(
        &self,
        video: Video,
        upload: IncomingUpload<S>,
    ) -> Result<Video, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let (content_type, ext) = self.thumbnail_policy.resolve(&upload.content_type)?;
        let staged = self
            .staging
            .stage(
                upload.body,
                &upload.content_type,
                upload.declared_size,
                &self.thumbnail_policy,
            )
            .await?;

        let outcome = async {
            let key = asset_key(ext);
            let url = self.publisher.publish(staged.path(), &key, content_type).await?;
            self.commit(video.id, AssetSlot::Thumbnail, &key, &url).await
        }
        .await;

        staged.release_logged().await;

        match &outcome {
            Ok(_) => info!(video_id = %video.id, "thumbnail published"),
            Err(e) => error!(video_id = %video.id, kind = e.kind(), error = %e, "thumbnail upload failed"),
        }
        outcome
    }

    /// Writes the new address into its column of the record. A failure here
    /// leaves the uploaded object orphaned; it is appended to the ledger, never
    /// deleted.
    async fn commit(
        &self,
        video_id: Uuid,
        slot: AssetSlot,
        key: &str,
        url: &str,
    ) -> Result<Video, AppError> {
        let result = match slot {
            AssetSlot::Video => self.records.set_video_url(video_id, url).await,
            AssetSlot::Thumbnail => self.records.set_thumbnail_url(video_id, url).await,
        };

        match result {
            Ok(updated) => Ok(updated),
            Err(e) => {
                error!(%video_id, ?slot, key, url, error = %e, "metadata commit failed after upload, object orphaned");
                let entry = OrphanRecord::new(video_id, key, url, e.to_string());
                if let Err(ledger_err) = self.orphans.record(&entry).await {
                    error!(
                        %video_id,
                        key,
                        ledger = %self.orphans.path().display(),
                        error = %ledger_err,
                        "failed to record orphaned object"
                    );
                }
                Err(e.into())
            }
        }
    }
}
