use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::ObjectStore;
use crate::media::pipeline::PublishOrchestrator;
use crate::modules::video::repository::VideoRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub videos: Arc<dyn VideoRepository>,
    pub pipeline: Arc<PublishOrchestrator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        videos: Arc<dyn VideoRepository>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        let pipeline = PublishOrchestrator::from_config(&config, storage, videos.clone());
        Self {
            config,
            videos,
            pipeline: Arc::new(pipeline),
        }
    }
}
