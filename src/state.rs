use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::modules::transcode::{JobSubmitter, PackagingQueue, TranscodeStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TranscodeStore>,
    pub jobs: Arc<dyn JobSubmitter>,
    pub queue: Arc<dyn PackagingQueue>,
    /// Shared client for ad-server requests.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TranscodeStore>,
        jobs: Arc<dyn JobSubmitter>,
        queue: Arc<dyn PackagingQueue>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            jobs,
            queue,
            http,
        }
    }
}
