//! Mock transcoder.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::modules::transcode::{EncoreJob, JobError, JobSubmitter, ManifestAsset};

/// Records submitted creatives and serves jobs registered with [`MockJobSubmitter::add_job`].
#[derive(Debug, Default)]
pub struct MockJobSubmitter {
    created: Mutex<Vec<ManifestAsset>>,
    jobs: Mutex<HashMap<String, EncoreJob>>,
    fail_creates: AtomicBool,
}

impl MockJobSubmitter {
    pub fn add_job(&self, job: EncoreJob) {
        lock(&self.jobs).insert(job.id.clone(), job);
    }

    /// Makes every following `create_job` fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<ManifestAsset> {
        lock(&self.created).clone()
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.created().into_iter().map(|a| a.creative_id).collect()
    }

    /// Dispatch is fire-and-forget, so tests poll for the jobs to show up.
    /// Returns false if fewer than `count` jobs were created within two seconds.
    pub async fn wait_for_created(&self, count: usize) -> bool {
        for _ in 0..200 {
            if lock(&self.created).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl JobSubmitter for MockJobSubmitter {
    async fn create_job(&self, asset: &ManifestAsset) -> Result<EncoreJob, JobError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(JobError::Status {
                status: 503,
                body: "transcoder unavailable".to_string(),
            });
        }

        let mut created = lock(&self.created);
        created.push(asset.clone());
        let job = EncoreJob {
            id: format!("job-{}", created.len()),
            external_id: asset.creative_id.clone(),
            base_name: asset.creative_id.clone(),
            status: "NEW".to_string(),
            ..Default::default()
        };
        drop(created);

        self.add_job(job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, JobError> {
        lock(&self.jobs)
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }
}
