use serde::{Deserialize, Serialize, de::DeserializeOwned};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AppError;

/// Progress report pushed by the transcoder.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    #[validate(length(min = 1, message = "jobId is required"))]
    pub job_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub progress: i64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingSuccessEvent {
    #[validate(length(min = 1, message = "jobId is required"))]
    pub job_id: String,
    #[serde(default)]
    pub url: String,
    #[validate(length(min = 1, message = "outputPath is required"))]
    pub output_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct PackagingFailureEvent {
    #[validate(nested)]
    pub message: PackagingFailureMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagingFailureMessage {
    #[validate(length(min = 1, message = "jobId is required"))]
    pub job_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackAction {
    /// A record was written.
    Stored,
    /// The record was removed.
    Removed,
    /// Nothing to do for this event.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
    pub creative_id: String,
    pub action: CallbackAction,
}

impl CallbackOutcome {
    pub fn new(creative_id: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            creative_id: creative_id.into(),
            action,
        }
    }
}

/// Decodes and validates a callback body; anything malformed is a 400.
pub fn decode_event<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let event: T = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid callback body: {e}")))?;
    event
        .validate()
        .map_err(|e| AppError::BadRequest(format!("invalid callback body: {e}")))?;
    Ok(event)
}
