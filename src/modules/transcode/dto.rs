use serde::{Deserialize, Serialize};

/// Transcoder job as submitted to and returned by the transcoding service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreJob {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub output_folder: String,
    #[serde(default)]
    pub base_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default)]
    pub inputs: Vec<EncoreInput>,
    #[serde(default, alias = "outputs", skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<EncoreOutput>,
    #[serde(default)]
    pub progress_callback_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoreInput {
    pub uri: String,
    #[serde(default)]
    pub seek_to: u64,
    #[serde(default)]
    pub copy_ts: bool,
    #[serde(rename = "type", default)]
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoreOutput {
    #[serde(rename = "type")]
    pub media_type: String,
    pub format: String,
    pub file: String,
    pub file_size: i64,
    pub overall_bitrate: i64,
    pub video_streams: Vec<EncoreVideoStream>,
    pub audio_streams: Vec<EncoreAudioStream>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoreVideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoreAudioStream {
    pub codec: String,
    pub channels: u32,
    pub sampling_rate: u32,
    pub profile: String,
}

/// Job states reported by the transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoreStatus {
    New,
    Queued,
    InProgress,
    Successful,
    Failed,
    Cancelled,
}

impl EncoreStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NEW" => Some(EncoreStatus::New),
            "QUEUED" => Some(EncoreStatus::Queued),
            "IN_PROGRESS" => Some(EncoreStatus::InProgress),
            "SUCCESSFUL" => Some(EncoreStatus::Successful),
            "FAILED" => Some(EncoreStatus::Failed),
            "CANCELLED" => Some(EncoreStatus::Cancelled),
            _ => None,
        }
    }
}

/// Message picked up by the packager once a non-JIT transcode finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingQueueMessage {
    pub job_id: String,
    pub url: String,
}
