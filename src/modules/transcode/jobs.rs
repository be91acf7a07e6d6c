use async_trait::async_trait;
use thiserror::Error;

use super::dto::EncoreJob;
use super::model::ManifestAsset;

#[derive(Debug, Error)]
pub enum JobError {
    /// Transport failure talking to the transcoder.
    #[error("transcoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The transcoder answered with an unexpected status.
    #[error("transcoder returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a job.
    #[error("failed to decode transcoder job: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid transcoder url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No job with this id is known.
    #[error("job {0} not found")]
    NotFound(String),
}

/// Submits transcode jobs and looks them up again.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn create_job(&self, asset: &ManifestAsset) -> Result<EncoreJob, JobError>;

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, JobError>;
}
