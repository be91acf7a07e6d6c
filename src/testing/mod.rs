//! In-process doubles for the store and the transcoder, plus a ready-made
//! configuration, so handlers can be exercised without Redis or a transcoder.

mod memory_store;
mod mock_jobs;

pub use memory_store::MemoryStore;
pub use mock_jobs::MockJobSubmitter;

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::config::settings::AppConfig;
use crate::infrastructure::http::client::build_client;
use crate::modules::ads::resolver::{KeyField, KeyRule};
use crate::state::AppState;

/// Configuration with fixed example hosts and `url` keys, pointing at `ad_server`.
pub fn test_config(ad_server: Url) -> AppConfig {
    AppConfig {
        server_port: 0,
        ad_server_url: ad_server,
        asset_server_url: fixed_url("https://assets.example.com"),
        output_bucket_url: fixed_url("s3://bucket/ads"),
        encore_url: fixed_url("https://encore.example.com"),
        encore_profile: "program".to_string(),
        root_url: fixed_url("https://normalizer.example.com"),
        osc_access_token: None,
        redis_url: "redis://localhost:6379".to_string(),
        key_rule: KeyRule::new(KeyField::Url, default_key_regex()),
        jit_packaging: false,
        packaging_queue: "package".to_string(),
        in_flight_ttl: None,
        upstream_timeout: Duration::from_secs(2),
        store_timeout: Duration::from_secs(1),
    }
}

/// State over a [`MemoryStore`] (also the packaging queue) and a [`MockJobSubmitter`].
pub fn test_state(
    store: Arc<MemoryStore>,
    jobs: Arc<MockJobSubmitter>,
    configure: impl FnOnce(&mut AppConfig),
) -> AppState {
    let mut config = test_config(fixed_url("http://127.0.0.1:9"));
    configure(&mut config);
    let http = build_client(config.upstream_timeout)
        .unwrap_or_else(|e| panic!("failed to build http client: {e}"));
    AppState::new(config, store.clone(), jobs, store, http)
}

fn fixed_url(raw: &str) -> Url {
    Url::parse(raw).unwrap_or_else(|e| panic!("bad fixture url {raw}: {e}"))
}

fn default_key_regex() -> Regex {
    Regex::new("[^a-zA-Z0-9]").unwrap_or_else(|e| panic!("bad key regex: {e}"))
}
