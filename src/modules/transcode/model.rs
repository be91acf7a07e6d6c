use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

use super::dto::{EncoreJob, EncoreStatus};
use crate::common::url::package_url;

/// One playable creative: its cache key and the URL it should be served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestAsset {
    pub creative_id: String,
    pub master_playlist_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscodeStatus {
    Unknown,
    Failed,
    InProgress,
    Transcoding,
    Packaging,
    Completed,
}

impl TranscodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeStatus::Unknown => "UNKNOWN",
            TranscodeStatus::Failed => "FAILED",
            TranscodeStatus::InProgress => "IN_PROGRESS",
            TranscodeStatus::Transcoding => "TRANSCODING",
            TranscodeStatus::Packaging => "PACKAGING",
            TranscodeStatus::Completed => "COMPLETED",
        }
    }

    /// A job for the creative is running somewhere.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TranscodeStatus::InProgress | TranscodeStatus::Transcoding | TranscodeStatus::Packaging
        )
    }

    /// Status of a cache record derived from the transcoder's view of a job.
    pub fn from_job_status(status: Option<EncoreStatus>, jit_packaging: bool) -> Self {
        match status {
            Some(EncoreStatus::Successful) if jit_packaging => TranscodeStatus::Completed,
            Some(EncoreStatus::Successful) => TranscodeStatus::Packaging,
            Some(EncoreStatus::Failed | EncoreStatus::Cancelled) => TranscodeStatus::Failed,
            Some(EncoreStatus::New | EncoreStatus::Queued | EncoreStatus::InProgress) => {
                TranscodeStatus::InProgress
            }
            None => TranscodeStatus::Unknown,
        }
    }
}

impl fmt::Display for TranscodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transcode status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TranscodeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(TranscodeStatus::Unknown),
            "FAILED" => Ok(TranscodeStatus::Failed),
            "IN_PROGRESS" => Ok(TranscodeStatus::InProgress),
            "TRANSCODING" => Ok(TranscodeStatus::Transcoding),
            "PACKAGING" => Ok(TranscodeStatus::Packaging),
            "COMPLETED" => Ok(TranscodeStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl Serialize for TranscodeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TranscodeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Cache record for one creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default, alias = "framerates")]
    pub frame_rates: Vec<f64>,
    pub status: TranscodeStatus,
}

impl TranscodeInfo {
    /// Placeholder written while a job is being dispatched.
    pub fn in_flight() -> Self {
        Self {
            url: String::new(),
            aspect_ratio: String::new(),
            frame_rates: Vec::new(),
            status: TranscodeStatus::InProgress,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == TranscodeStatus::Completed && !self.url.is_empty()
    }

    /// Builds the record for a transcoder job. The URL points at the packaged manifest
    /// only with just-in-time packaging; otherwise packaging fills it in later.
    pub fn from_job(
        job: &EncoreJob,
        jit_packaging: bool,
        asset_server: &Url,
    ) -> Result<Self, url::ParseError> {
        let url = if jit_packaging {
            package_url(asset_server, &job.output_folder, &job.base_name)?.to_string()
        } else {
            String::new()
        };

        Ok(Self {
            url,
            aspect_ratio: aspect_ratio(job),
            frame_rates: frame_rates(job),
            status: TranscodeStatus::from_job_status(EncoreStatus::parse(&job.status), jit_packaging),
        })
    }
}

fn aspect_ratio(job: &EncoreJob) -> String {
    let (width, height) = job
        .output
        .iter()
        .flat_map(|output| output.video_streams.iter())
        .next()
        .map(|stream| (stream.width, stream.height))
        .filter(|(w, h)| *w > 0 && *h > 0)
        .unwrap_or((1920, 1080));
    let divisor = gcd(width, height);
    format!("{}:{}", width / divisor, height / divisor)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn frame_rates(job: &EncoreJob) -> Vec<f64> {
    job.output
        .iter()
        .flat_map(|output| output.video_streams.iter())
        .filter_map(|stream| parse_frame_rate(&stream.frame_rate))
        .collect()
}

/// Parses `30000/1001` or `25`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    rate.is_finite().then_some(rate)
}
