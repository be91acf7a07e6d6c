use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

use crate::modules::transcode::{
    PackagingQueue, PackagingQueueMessage, StoreError, TranscodeInfo, TranscodeStore,
};

/// Transcode records and the packaging queue, both kept in Redis.
#[derive(Clone)]
pub struct RedisService {
    conn: MultiplexedConnection,
    packaging_queue: String,
    timeout: Duration,
}

impl RedisService {
    pub async fn new(
        connection_string: &str,
        packaging_queue: &str,
        timeout: Duration,
    ) -> Result<Self, redis::RedisError> {
        let client = Client::open(connection_string)?;
        let conn = client.get_multiplexed_async_connection().await?;

        info!("✅ Connected to Redis");
        Ok(Self {
            conn,
            packaging_queue: packaging_queue.to_string(),
            timeout,
        })
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

/// Millisecond TTL for `PX`/`PEXPIRE`; Redis rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// `SET` followed by `PEXPIRE` or `PERSIST` in one transaction, so a plain write
/// also clears an expiry left by an earlier marker.
fn set_pipeline(key: &str, payload: &str, ttl: Option<Duration>) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic().cmd("SET").arg(key).arg(payload).ignore();
    match ttl {
        Some(ttl) => pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl)).ignore(),
        None => pipe.cmd("PERSIST").arg(key).ignore(),
    };
    pipe
}

fn claim_command(key: &str, payload: &str, ttl: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(payload).arg("NX").arg("PX").arg(ttl_millis(ttl));
    cmd
}

#[async_trait]
impl TranscodeStore for RedisService {
    async fn get(&self, key: &str) -> Result<Option<TranscodeInfo>, StoreError> {
        let mut conn = self.conn.clone();
        let raw = self
            .bounded(async {
                let raw: Option<String> = conn.get(key).await?;
                Ok::<_, StoreError>(raw)
            })
            .await?;

        match raw {
            None => Ok(None),
            Some(value) if value.is_empty() => Err(StoreError::EmptyValue(key.to_string())),
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &TranscodeInfo,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(value)?;
        let pipe = set_pipeline(key, &payload, ttl);

        let mut conn = self.conn.clone();
        self.bounded(async {
            let _: () = pipe.query_async(&mut conn).await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        debug!(creative_id = key, status = %value.status, "stored transcode record");
        Ok(())
    }

    async fn claim(&self, key: &str, value: &TranscodeInfo, ttl: Duration) -> Result<bool, StoreError> {
        let payload = serde_json::to_string(value)?;
        let cmd = claim_command(key, &payload, ttl);

        let mut conn = self.conn.clone();
        let reply = self
            .bounded(async {
                let reply: Option<String> = cmd.query_async(&mut conn).await?;
                Ok::<_, StoreError>(reply)
            })
            .await?;

        let claimed = reply.is_some();
        debug!(creative_id = key, claimed, "claimed in-flight marker");
        Ok(claimed)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        self.bounded(async {
            let _: () = conn.del(key).await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}

#[async_trait]
impl PackagingQueue for RedisService {
    async fn enqueue(&self, message: &PackagingQueueMessage) -> Result<(), StoreError> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        self.bounded(async {
            let _: () = conn.lpush(&self.packaging_queue, payload).await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        info!(job_id = %message.job_id, queue = %self.packaging_queue, "📦 Queued packaging job");
        Ok(())
    }
}
