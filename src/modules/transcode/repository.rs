use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::dto::PackagingQueueMessage;
use super::model::TranscodeInfo;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation did not finish within the configured timeout.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or command failure reported by the backend.
    #[error("store connection error: {0}")]
    Connection(#[from] redis::RedisError),

    /// A stored value could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key exists but holds an empty value.
    #[error("empty value stored under key {0}")]
    EmptyValue(String),

    /// Injected failure, used by in-memory doubles.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Creative id to transcode record.
#[async_trait]
pub trait TranscodeStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<TranscodeInfo>, StoreError>;

    /// Without a TTL the key never expires; with one it expires after exactly `ttl`.
    async fn set(
        &self,
        key: &str,
        value: &TranscodeInfo,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Writes `value` with `ttl` only when nothing is stored under `key`, in one step.
    /// Returns false, without writing, when the key already exists.
    async fn claim(&self, key: &str, value: &TranscodeInfo, ttl: Duration) -> Result<bool, StoreError>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Hands finished transcodes over to the packager.
#[async_trait]
pub trait PackagingQueue: Send + Sync {
    async fn enqueue(&self, message: &PackagingQueueMessage) -> Result<(), StoreError>;
}
