use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tracing::info;
use url::Url;

use crate::common::url::{join_path, output_folder};
use crate::config::settings::AppConfig;
use crate::modules::transcode::{EncoreJob, JobError, JobSubmitter, ManifestAsset};
use crate::modules::transcode::dto::EncoreInput;

const HAL_JSON: &str = "application/hal+json";

/// Transcoding service client.
#[derive(Clone)]
pub struct EncoreClient {
    client: Client,
    encore_url: Url,
    profile: String,
    output_bucket: Url,
    callback_url: Url,
    access_token: Option<String>,
}

impl EncoreClient {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            encore_url: config.encore_url.clone(),
            profile: config.encore_profile.clone(),
            output_bucket: config.output_bucket_url.clone(),
            callback_url: join_path(&config.root_url, "/encoreCallback"),
            access_token: config.osc_access_token.clone(),
        }
    }

    fn jobs_url(&self) -> Url {
        join_path(&self.encore_url, "/encoreJobs")
    }

    /// The job the transcoder is asked to run for one creative.
    pub fn job_for(&self, asset: &ManifestAsset) -> EncoreJob {
        EncoreJob {
            external_id: asset.creative_id.clone(),
            profile: self.profile.clone(),
            output_folder: output_folder(&self.output_bucket, &asset.creative_id),
            base_name: asset.creative_id.clone(),
            progress_callback_uri: self.callback_url.to_string(),
            inputs: vec![EncoreInput {
                uri: asset.master_playlist_url.clone(),
                seek_to: 0,
                copy_ts: true,
                media_type: "AudioVideo".to_string(),
            }],
            ..Default::default()
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.header("x-jwt", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn decode(response: reqwest::Response, expected: StatusCode) -> Result<EncoreJob, JobError> {
        let status = response.status();
        let body = response.text().await?;
        if status != expected {
            return Err(JobError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl JobSubmitter for EncoreClient {
    async fn create_job(&self, asset: &ManifestAsset) -> Result<EncoreJob, JobError> {
        let job = self.job_for(asset);
        let request = self
            .client
            .post(self.jobs_url())
            .header(header::ACCEPT, HAL_JSON)
            .json(&job);

        let response = self.authorize(request).send().await?;
        let created = Self::decode(response, StatusCode::CREATED).await?;

        info!(creative_id = %asset.creative_id, job_id = %created.id, "🎬 Submitted transcode job");
        Ok(created)
    }

    async fn get_job(&self, job_id: &str) -> Result<EncoreJob, JobError> {
        let url = join_path(&self.jobs_url(), job_id);
        let request = self.client.get(url).header(header::ACCEPT, HAL_JSON);

        let response = self.authorize(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(JobError::NotFound(job_id.to_string()));
        }
        Self::decode(response, StatusCode::OK).await
    }
}
