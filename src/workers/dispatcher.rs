use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::modules::transcode::{JobSubmitter, ManifestAsset, TranscodeInfo, TranscodeStore};
use crate::state::AppState;

/// Starts one transcode job per missing creative without waiting for any of them.
///
/// With an in-flight TTL configured, each creative is first claimed with a short-lived
/// `IN_PROGRESS` marker that is only written when no record exists. A creative another
/// request already claimed is skipped. The marker is removed again when job creation
/// fails. The returned handles are only useful to tests; request handlers drop them.
pub async fn dispatch(
    state: &AppState,
    missing: HashMap<String, ManifestAsset>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(missing.len());

    for creative in missing.into_values() {
        if creative.master_playlist_url.is_empty() {
            warn!(creative_id = %creative.creative_id, "creative has no media url, not transcoding");
            continue;
        }

        let marked = match state.config.in_flight_ttl {
            Some(ttl) => match claim(state.store.as_ref(), &creative.creative_id, ttl).await {
                Claim::Won => true,
                Claim::Lost => continue,
                Claim::Unmarked => false,
            },
            None => false,
        };

        let store = Arc::clone(&state.store);
        let jobs = Arc::clone(&state.jobs);
        handles.push(tokio::spawn(async move {
            submit(jobs.as_ref(), store.as_ref(), &creative, marked).await;
        }));
    }

    handles
}

enum Claim {
    /// The marker was written by this request.
    Won,
    /// Something is already stored for the creative.
    Lost,
    /// The marker could not be written; the job is submitted anyway.
    Unmarked,
}

async fn claim(store: &dyn TranscodeStore, creative_id: &str, ttl: Duration) -> Claim {
    match store.claim(creative_id, &TranscodeInfo::in_flight(), ttl).await {
        Ok(true) => Claim::Won,
        Ok(false) => {
            debug!(creative_id, "creative already claimed, not dispatching");
            Claim::Lost
        }
        Err(e) => {
            warn!(creative_id, error = %e, "failed to write in-flight marker");
            Claim::Unmarked
        }
    }
}

async fn submit(
    jobs: &dyn JobSubmitter,
    store: &dyn TranscodeStore,
    creative: &ManifestAsset,
    marked: bool,
) {
    match jobs.create_job(creative).await {
        Ok(job) => {
            info!(creative_id = %creative.creative_id, job_id = %job.id, "🚀 Dispatched transcode job");
        }
        Err(e) => {
            error!(creative_id = %creative.creative_id, error = %e, "❌ Failed to create transcode job");
            if marked {
                if let Err(e) = store.delete(&creative.creative_id).await {
                    warn!(creative_id = %creative.creative_id, error = %e, "failed to clear in-flight marker");
                } else {
                    debug!(creative_id = %creative.creative_id, "cleared in-flight marker");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcode::TranscodeStatus;
    use crate::testing::{MemoryStore, MockJobSubmitter, test_state};

    fn missing(ids: &[&str]) -> HashMap<String, ManifestAsset> {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    ManifestAsset {
                        creative_id: id.to_string(),
                        master_playlist_url: format!("http://example.com/{id}.mp4"),
                    },
                )
            })
            .collect()
    }

    async fn join(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn submits_one_job_per_creative() {
        let store = Arc::new(MemoryStore::default());
        let jobs = Arc::new(MockJobSubmitter::default());
        let state = test_state(store.clone(), jobs.clone(), |_| {});

        join(dispatch(&state, missing(&["a", "b"])).await).await;

        let mut created = jobs.created_ids();
        created.sort();
        assert_eq!(created, vec!["a", "b"]);
        assert_eq!(store.set_calls(), 0);
    }

    #[tokio::test]
    async fn skips_creatives_without_url() {
        let jobs = Arc::new(MockJobSubmitter::default());
        let state = test_state(Arc::new(MemoryStore::default()), jobs.clone(), |_| {});
        let mut creatives = missing(&["a"]);
        creatives.get_mut("a").unwrap().master_playlist_url.clear();

        join(dispatch(&state, creatives).await).await;
        assert!(jobs.created_ids().is_empty());
    }

    #[tokio::test]
    async fn writes_in_flight_marker_when_enabled() {
        let store = Arc::new(MemoryStore::default());
        let jobs = Arc::new(MockJobSubmitter::default());
        let state = test_state(store.clone(), jobs.clone(), |c| {
            c.in_flight_ttl = Some(Duration::from_secs(60));
        });

        join(dispatch(&state, missing(&["a"])).await).await;

        let marker = store.record("a").unwrap();
        assert_eq!(marker.status, TranscodeStatus::InProgress);
        assert_eq!(store.ttl_of("a"), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn concurrent_dispatches_claim_a_creative_once() {
        let store = Arc::new(MemoryStore::default());
        let jobs = Arc::new(MockJobSubmitter::default());
        let state = test_state(store.clone(), jobs.clone(), |c| {
            c.in_flight_ttl = Some(Duration::from_secs(60));
        });

        let (first, second) = tokio::join!(
            dispatch(&state, missing(&["a"])),
            dispatch(&state, missing(&["a"])),
        );
        assert_eq!(first.len() + second.len(), 1);
        join(first).await;
        join(second).await;

        assert_eq!(jobs.created_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn existing_record_is_not_overwritten_by_marker() {
        let store = Arc::new(MemoryStore::default());
        store.insert(
            "a",
            TranscodeInfo {
                status: TranscodeStatus::Packaging,
                ..TranscodeInfo::in_flight()
            },
        );
        let jobs = Arc::new(MockJobSubmitter::default());
        let state = test_state(store.clone(), jobs.clone(), |c| {
            c.in_flight_ttl = Some(Duration::from_secs(60));
        });

        join(dispatch(&state, missing(&["a"])).await).await;

        assert!(jobs.created_ids().is_empty());
        assert_eq!(store.record("a").unwrap().status, TranscodeStatus::Packaging);
        assert_eq!(store.ttl_of("a"), None);
    }

    #[tokio::test]
    async fn failed_submission_clears_marker() {
        let store = Arc::new(MemoryStore::default());
        let jobs = Arc::new(MockJobSubmitter::default());
        jobs.fail_creates(true);
        let state = test_state(store.clone(), jobs.clone(), |c| {
            c.in_flight_ttl = Some(Duration::from_secs(60));
        });

        join(dispatch(&state, missing(&["a"])).await).await;

        assert!(store.record("a").is_none());
        assert_eq!(store.delete_calls(), 1);
    }
}
