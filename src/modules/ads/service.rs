use std::collections::HashMap;

use futures_util::future::join_all;
use tracing::{debug, error, info};

use super::resolver::KeyRule;
use crate::common::error::AppError;
use crate::modules::transcode::ManifestAsset;
use crate::state::AppState;
use crate::vast::{self, Element};
use crate::workers::dispatcher;

pub type Creatives = HashMap<String, ManifestAsset>;

/// Creatives split by cache state.
#[derive(Debug, Default, PartialEq)]
pub struct Partition {
    /// Cached and complete; `master_playlist_url` is the packaged URL.
    pub ready: Creatives,
    /// Need a transcode; `master_playlist_url` is the original rendition.
    pub missing: Creatives,
}

pub struct AdService;

impl AdService {
    /// Looks every creative up in the store. Lookup failures drop the creative from
    /// both sets for this request. With the in-flight marker enabled, creatives
    /// whose job is still running are left out of both as well.
    pub async fn partition(state: &AppState, creatives: Creatives) -> Partition {
        let skip_in_flight = state.config.in_flight_ttl.is_some();
        let mut partition = Partition::default();

        for (key, creative) in creatives {
            let record = match state.store.get(&key).await {
                Ok(record) => record,
                Err(e) => {
                    error!(creative_id = %key, error = %e, "failed to look up creative, skipping");
                    continue;
                }
            };

            match record {
                Some(record) if record.is_ready() => {
                    partition.ready.insert(
                        key.clone(),
                        ManifestAsset {
                            creative_id: key,
                            master_playlist_url: record.url,
                        },
                    );
                }
                Some(record) if skip_in_flight && record.status.is_in_flight() => {
                    debug!(creative_id = %key, status = %record.status, "transcode already in flight");
                }
                _ => {
                    partition.missing.insert(key, creative);
                }
            }
        }

        partition
    }

    /// Swaps the media of every ad whose key is ready. Other ads are left as they are.
    pub fn rewrite(vast_doc: &mut Element, ready: &Creatives, rule: &KeyRule) -> usize {
        let mut rewritten = 0;
        for ad in vast::ads_mut(vast_doc) {
            let key = rule.resolve(ad);
            if let Some(asset) = ready.get(&key) {
                if vast::replace_media_files(ad, &asset.master_playlist_url) {
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    /// Partition, dispatch and rewrite for one VAST document, in place.
    pub async fn process_vast(state: &AppState, vast_doc: &mut Element) {
        let rule = &state.config.key_rule;
        let creatives = rule.creatives(vast_doc);
        let total = creatives.len();

        let Partition { ready, missing } = Self::partition(state, creatives).await;
        debug!(total, ready = ready.len(), missing = missing.len(), "partitioned creatives");

        drop(dispatcher::dispatch(state, missing).await);

        Self::rewrite(vast_doc, &ready, rule);
    }

    pub async fn normalize_vast(state: &AppState, body: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut doc = vast::decode_vast(body).map_err(AppError::Decode)?;
        Self::process_vast(state, &mut doc).await;
        doc.to_xml().map_err(AppError::Encode)
    }

    /// Processes every ad break that embeds a VAST document concurrently and waits
    /// for all of them before encoding.
    pub async fn normalize_vmap(state: &AppState, body: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut doc = vast::decode_vmap(body).map_err(AppError::Decode)?;

        let tasks: Vec<_> = vast::ad_breaks_mut(&mut doc)
            .enumerate()
            .filter_map(|(index, ad_break)| {
                // The placeholder keeps the element name so the slot can be found again.
                vast::embedded_vast_mut(ad_break).map(|embedded| {
                    let placeholder = Element::new(embedded.name.clone());
                    (index, std::mem::replace(embedded, placeholder))
                })
            })
            .map(|(index, mut embedded)| {
                let state = state.clone();
                let task = tokio::spawn(async move {
                    Self::process_vast(&state, &mut embedded).await;
                    embedded
                });
                (index, task)
            })
            .collect();

        let breaks = tasks.len();
        let (indices, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = join_all(handles).await;

        let mut processed = HashMap::with_capacity(breaks);
        for (index, result) in indices.into_iter().zip(results) {
            let embedded = result.map_err(|e| AppError::Internal(format!("ad break task failed: {e}")))?;
            processed.insert(index, embedded);
        }

        for (index, ad_break) in vast::ad_breaks_mut(&mut doc).enumerate() {
            if let (Some(slot), Some(embedded)) =
                (vast::embedded_vast_mut(ad_break), processed.remove(&index))
            {
                *slot = embedded;
            }
        }

        info!(breaks, "normalized vmap");
        doc.to_xml().map_err(AppError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use regex::Regex;

    use crate::modules::ads::resolver::KeyField;
    use crate::modules::transcode::{TranscodeInfo, TranscodeStatus};
    use crate::testing::{MemoryStore, MockJobSubmitter, test_state};

    fn asset(id: &str, url: &str) -> (String, ManifestAsset) {
        (
            id.to_string(),
            ManifestAsset {
                creative_id: id.to_string(),
                master_playlist_url: url.to_string(),
            },
        )
    }

    fn record(url: &str, status: TranscodeStatus) -> TranscodeInfo {
        TranscodeInfo {
            url: url.to_string(),
            aspect_ratio: "16:9".to_string(),
            frame_rates: vec![25.0],
            status,
        }
    }

    #[tokio::test]
    async fn partitions_by_cache_state() {
        let store = Arc::new(MemoryStore::default());
        store.insert("done", record("https://cdn/done.m3u8", TranscodeStatus::Completed));
        store.insert("running", record("", TranscodeStatus::InProgress));
        store.insert("broken", record("", TranscodeStatus::Failed));
        store.fail_key("flaky");
        let state = test_state(store, Arc::new(MockJobSubmitter::default()), |_| {});

        let creatives: Creatives = [
            asset("done", "http://a/done.mp4"),
            asset("running", "http://a/running.mp4"),
            asset("broken", "http://a/broken.mp4"),
            asset("new", "http://a/new.mp4"),
            asset("flaky", "http://a/flaky.mp4"),
        ]
        .into_iter()
        .collect();

        let Partition { ready, missing } = AdService::partition(&state, creatives).await;

        assert_eq!(ready.len(), 1);
        assert_eq!(ready["done"].master_playlist_url, "https://cdn/done.m3u8");

        let mut missing_keys: Vec<_> = missing.keys().cloned().collect();
        missing_keys.sort();
        assert_eq!(missing_keys, vec!["broken", "new", "running"]);
        assert_eq!(missing["running"].master_playlist_url, "http://a/running.mp4");
        assert!(ready.keys().all(|k| !missing.contains_key(k)));
    }

    #[tokio::test]
    async fn in_flight_creatives_are_not_missing_when_marker_enabled() {
        let store = Arc::new(MemoryStore::default());
        store.insert("running", record("", TranscodeStatus::Transcoding));
        store.insert("packaging", record("", TranscodeStatus::Packaging));
        let state = test_state(store, Arc::new(MockJobSubmitter::default()), |c| {
            c.in_flight_ttl = Some(Duration::from_secs(30));
        });

        let creatives: Creatives = [
            asset("running", "http://a/r.mp4"),
            asset("packaging", "http://a/p.mp4"),
            asset("new", "http://a/n.mp4"),
        ]
        .into_iter()
        .collect();
        let partition = AdService::partition(&state, creatives).await;

        assert!(partition.ready.is_empty());
        assert_eq!(partition.missing.keys().collect::<Vec<_>>(), vec!["new"]);
    }

    #[tokio::test]
    async fn completed_record_without_url_is_missing() {
        let store = Arc::new(MemoryStore::default());
        store.insert("c", record("", TranscodeStatus::Completed));
        let state = test_state(store, Arc::new(MockJobSubmitter::default()), |_| {});

        let partition = AdService::partition(&state, [asset("c", "http://a/c.mp4")].into()).await;
        assert!(partition.ready.is_empty());
        assert!(partition.missing.contains_key("c"));
    }

    #[test]
    fn rewrite_only_touches_ready_ads() {
        let mut doc = vast::decode_vast(
            br#"<VAST version="4.0">
                <Ad id="1"><InLine><Creatives><Creative><UniversalAdId>AAA</UniversalAdId>
                    <Linear><MediaFiles><MediaFile bitrate="100">http://a/1.mp4</MediaFile></MediaFiles></Linear>
                </Creative></Creatives></InLine></Ad>
                <Ad id="2"><InLine><Creatives><Creative><UniversalAdId>BBB</UniversalAdId>
                    <Linear><MediaFiles><MediaFile bitrate="100">http://a/2.mp4</MediaFile></MediaFiles></Linear>
                </Creative></Creatives></InLine></Ad>
            </VAST>"#,
        )
        .unwrap();
        let rule = KeyRule::new(KeyField::UniversalAdId, Regex::new("[^a-zA-Z0-9]").unwrap());
        let ready: Creatives = [asset("AAA", "https://cdn/aaa.m3u8")].into();

        assert_eq!(AdService::rewrite(&mut doc, &ready, &rule), 1);

        let ads: Vec<_> = vast::ads(&doc).collect();
        assert_eq!(vast::media_files(ads[0])[0].url, "https://cdn/aaa.m3u8");
        assert_eq!(vast::media_files(ads[0])[0].media_type, vast::HLS_MEDIA_TYPE);
        assert_eq!(vast::media_files(ads[1])[0].url, "http://a/2.mp4");
    }

    #[tokio::test]
    async fn vmap_breaks_keep_their_embedded_vast() {
        let store = Arc::new(MemoryStore::default());
        store.insert("PRE", record("https://cdn/pre.m3u8", TranscodeStatus::Completed));
        let state = test_state(store, Arc::new(MockJobSubmitter::default()), |c| {
            c.key_rule = KeyRule::new(KeyField::UniversalAdId, Regex::new("[^a-zA-Z0-9]").unwrap());
        });

        let body = br#"<vmap:VMAP xmlns:vmap="http://www.iab.net/videosuite/vmap" version="1.0">
            <vmap:AdBreak breakId="pre"><vmap:AdSource><vmap:VASTAdData>
                <VAST version="4.0"><Ad id="1"><InLine><Creatives><Creative><UniversalAdId>PRE</UniversalAdId>
                    <Linear><MediaFiles><MediaFile bitrate="100">http://a/pre.mp4</MediaFile></MediaFiles></Linear>
                </Creative></Creatives></InLine></Ad></VAST>
            </vmap:VASTAdData></vmap:AdSource></vmap:AdBreak>
            <vmap:AdBreak breakId="mid"><vmap:AdSource><vmap:VASTAdData>
                <VAST version="4.0"><Ad id="2"><InLine><Creatives><Creative><UniversalAdId>MID</UniversalAdId>
                    <Linear><MediaFiles><MediaFile bitrate="100">http://a/mid.mp4</MediaFile></MediaFiles></Linear>
                </Creative></Creatives></InLine></Ad></VAST>
            </vmap:VASTAdData></vmap:AdSource></vmap:AdBreak>
        </vmap:VMAP>"#;

        let encoded = AdService::normalize_vmap(&state, body).await.unwrap();
        let mut doc = vast::decode_vmap(&encoded).unwrap();

        let urls: Vec<Vec<String>> = vast::ad_breaks_mut(&mut doc)
            .map(|ad_break| {
                let embedded = vast::embedded_vast_mut(ad_break).expect("break lost its VAST");
                assert_eq!(embedded.attr("version"), Some("4.0"));
                vast::ads(embedded)
                    .flat_map(vast::media_files)
                    .map(|m| m.url)
                    .collect()
            })
            .collect();

        assert_eq!(
            urls,
            vec![
                vec!["https://cdn/pre.m3u8".to_string()],
                vec!["http://a/mid.mp4".to_string()],
            ]
        );
    }
}
