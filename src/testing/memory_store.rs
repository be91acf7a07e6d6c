//! In-memory cache store and packaging queue.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::modules::transcode::{
    PackagingQueue, PackagingQueueMessage, StoreError, TranscodeInfo, TranscodeStore,
};

/// Implements both [`TranscodeStore`] and [`PackagingQueue`].
///
/// - Counts every operation for assertions
/// - Remembers the TTL each key was written with
/// - Fails every operation on keys registered with [`MemoryStore::fail_key`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, (TranscodeInfo, Option<Duration>)>>,
    failing: Mutex<HashSet<String>>,
    messages: Mutex<Vec<PackagingQueueMessage>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    /// Seeds a record without counting it as a `set`.
    pub fn insert(&self, key: &str, record: TranscodeInfo) {
        lock(&self.records).insert(key.to_string(), (record, None));
    }

    pub fn fail_key(&self, key: &str) {
        lock(&self.failing).insert(key.to_string());
    }

    pub fn record(&self, key: &str) -> Option<TranscodeInfo> {
        lock(&self.records).get(key).map(|(record, _)| record.clone())
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        lock(&self.records).get(key).and_then(|(_, ttl)| *ttl)
    }

    pub fn messages(&self) -> Vec<PackagingQueueMessage> {
        lock(&self.messages).clone()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if lock(&self.failing).contains(key) {
            return Err(StoreError::Unavailable(format!("injected failure for {key}")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TranscodeStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<TranscodeInfo>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check(key)?;
        Ok(self.record(key))
    }

    async fn set(
        &self,
        key: &str,
        value: &TranscodeInfo,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check(key)?;
        lock(&self.records).insert(key.to_string(), (value.clone(), ttl));
        Ok(())
    }

    async fn claim(&self, key: &str, value: &TranscodeInfo, ttl: Duration) -> Result<bool, StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check(key)?;
        let mut records = lock(&self.records);
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), (value.clone(), Some(ttl)));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(key)?;
        lock(&self.records).remove(key);
        Ok(())
    }
}

#[async_trait]
impl PackagingQueue for MemoryStore {
    async fn enqueue(&self, message: &PackagingQueueMessage) -> Result<(), StoreError> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }
}
