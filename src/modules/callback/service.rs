use tracing::{info, warn};

use super::dto::{
    CallbackAction, CallbackOutcome, JobProgressEvent, PackagingFailureEvent, PackagingSuccessEvent,
};
use crate::common::error::AppError;
use crate::common::url::{join_path, package_url};
use crate::modules::transcode::{
    EncoreJob, EncoreStatus, PackagingQueueMessage, TranscodeInfo, TranscodeStatus,
};
use crate::state::AppState;

const PACKAGED_MANIFEST: &str = "index";

/// Applies transcoder and packager events to the cache. Every handler can be
/// replayed: writes overwrite with the same record and deletes tolerate absent keys.
pub struct CallbackService;

impl CallbackService {
    pub async fn handle_progress(
        state: &AppState,
        event: JobProgressEvent,
    ) -> Result<CallbackOutcome, AppError> {
        match EncoreStatus::parse(&event.status) {
            Some(EncoreStatus::Successful) => Self::transcode_completed(state, &event.job_id).await,
            Some(EncoreStatus::Failed) => Self::transcode_failed(state, &event).await,
            Some(EncoreStatus::InProgress) => {
                info!(
                    job_id = %event.job_id,
                    creative_id = %event.external_id,
                    progress = event.progress,
                    "⏳ Transcoding in progress"
                );
                Ok(CallbackOutcome::new(event.external_id, CallbackAction::Ignored))
            }
            _ => {
                info!(job_id = %event.job_id, status = %event.status, "job status needs no action");
                Ok(CallbackOutcome::new(event.external_id, CallbackAction::Ignored))
            }
        }
    }

    async fn transcode_completed(state: &AppState, job_id: &str) -> Result<CallbackOutcome, AppError> {
        let job = state.jobs.get_job(job_id).await?;
        let creative_id = external_id(&job)?;
        let config = &state.config;

        if !config.jit_packaging {
            if let Some(existing) = state.store.get(&creative_id).await? {
                if existing.is_ready() {
                    info!(%creative_id, job_id, "creative already packaged, keeping record");
                    return Ok(CallbackOutcome::new(creative_id, CallbackAction::Ignored));
                }
            }
        }

        let mut record = TranscodeInfo::from_job(&job, config.jit_packaging, &config.asset_server_url)
            .map_err(|e| AppError::Internal(format!("invalid package url for job {job_id}: {e}")))?;
        record.status = if config.jit_packaging {
            TranscodeStatus::Completed
        } else {
            TranscodeStatus::Packaging
        };
        state.store.set(&creative_id, &record, None).await?;

        if !config.jit_packaging {
            let message = PackagingQueueMessage {
                job_id: job_id.to_string(),
                url: join_path(&config.encore_url, &format!("/encoreJobs/{job_id}")).to_string(),
            };
            state.queue.enqueue(&message).await?;
        }

        info!(%creative_id, job_id, status = %record.status, "✅ Transcode finished");
        Ok(CallbackOutcome::new(creative_id, CallbackAction::Stored))
    }

    async fn transcode_failed(
        state: &AppState,
        event: &JobProgressEvent,
    ) -> Result<CallbackOutcome, AppError> {
        if event.external_id.is_empty() {
            warn!(job_id = %event.job_id, "failed job has no external id, nothing to remove");
            return Ok(CallbackOutcome::new("", CallbackAction::Ignored));
        }

        state.store.delete(&event.external_id).await?;
        warn!(creative_id = %event.external_id, job_id = %event.job_id, "❌ Transcode failed, record removed");
        Ok(CallbackOutcome::new(event.external_id.clone(), CallbackAction::Removed))
    }

    pub async fn handle_packaging_success(
        state: &AppState,
        event: PackagingSuccessEvent,
    ) -> Result<CallbackOutcome, AppError> {
        let job = Self::packaged_job(state, &event.job_id).await?;
        let creative_id = external_id(&job)?;
        let config = &state.config;

        let mut record = TranscodeInfo::from_job(&job, config.jit_packaging, &config.asset_server_url)
            .map_err(|e| AppError::Internal(format!("invalid package url for job {}: {e}", event.job_id)))?;
        let url = package_url(&config.asset_server_url, &event.output_path, PACKAGED_MANIFEST)
            .map_err(|e| AppError::BadRequest(format!("invalid output path {:?}: {e}", event.output_path)))?;
        record.url = url.to_string();
        record.status = TranscodeStatus::Completed;

        state.store.set(&creative_id, &record, None).await?;

        info!(%creative_id, job_id = %event.job_id, url = %record.url, "📦 Packaging finished");
        Ok(CallbackOutcome::new(creative_id, CallbackAction::Stored))
    }

    pub async fn handle_packaging_failure(
        state: &AppState,
        event: PackagingFailureEvent,
    ) -> Result<CallbackOutcome, AppError> {
        let job = Self::packaged_job(state, &event.message.job_id).await?;
        let creative_id = external_id(&job)?;

        state.store.delete(&creative_id).await?;

        warn!(%creative_id, job_id = %event.message.job_id, "❌ Packaging failed, record removed");
        Ok(CallbackOutcome::new(creative_id, CallbackAction::Removed))
    }

    /// Packaging events name jobs the transcoder should still know; any lookup
    /// failure means the event cannot be attributed.
    async fn packaged_job(state: &AppState, job_id: &str) -> Result<EncoreJob, AppError> {
        state.jobs.get_job(job_id).await.map_err(|e| {
            warn!(job_id, error = %e, "could not resolve packaged job");
            AppError::NotFound(format!("job {job_id} could not be resolved"))
        })
    }
}

fn external_id(job: &EncoreJob) -> Result<String, AppError> {
    if job.external_id.is_empty() {
        return Err(AppError::NotFound(format!("job {} has no external id", job.id)));
    }
    Ok(job.external_id.clone())
}
