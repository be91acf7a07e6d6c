use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::env::{self, EnvKey, Source};
use crate::modules::ads::resolver::{KeyField, KeyRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("{key} is not a valid url: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("KEY_REGEX is not a valid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub ad_server_url: Url,
    pub asset_server_url: Url,
    pub output_bucket_url: Url,
    pub encore_url: Url,
    pub encore_profile: String,
    pub root_url: Url,
    pub osc_access_token: Option<String>,
    pub redis_url: String,
    pub key_rule: KeyRule,
    pub jit_packaging: bool,
    pub packaging_queue: String,
    /// Lifetime of the in-flight marker; `None` disables it.
    pub in_flight_ttl: Option<Duration>,
    pub upstream_timeout: Duration,
    pub store_timeout: Duration,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(env::process_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source::new(&lookup);

        let key_field = KeyField::parse(&source.get_or(EnvKey::KeyField, "universalAdId"));
        let key_regex = Regex::new(&source.get_or(EnvKey::KeyRegex, "[^a-zA-Z0-9]"))?;
        let in_flight_secs: u64 = source.get_parsed(EnvKey::InFlightTtl, 0)?;

        Ok(Self {
            server_port: source.get_parsed(EnvKey::ServerPort, 8080)?,
            ad_server_url: url(&source, EnvKey::AdServerUrl)?,
            asset_server_url: url(&source, EnvKey::AssetServerUrl)?,
            output_bucket_url: url(&source, EnvKey::OutputBucketUrl)?,
            encore_url: url(&source, EnvKey::EncoreUrl)?,
            encore_profile: source.get_or(EnvKey::EncoreProfile, "program"),
            root_url: url(&source, EnvKey::RootUrl)?,
            osc_access_token: source.optional(EnvKey::OscAccessToken),
            redis_url: source.get(EnvKey::RedisUrl)?,
            key_rule: KeyRule::new(key_field, key_regex),
            jit_packaging: source
                .optional(EnvKey::JitPackage)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            packaging_queue: source.get_or(EnvKey::PackagingQueue, "package"),
            in_flight_ttl: (in_flight_secs > 0).then(|| Duration::from_secs(in_flight_secs)),
            upstream_timeout: Duration::from_millis(source.get_parsed(EnvKey::UpstreamTimeoutMs, 5000)?),
            store_timeout: Duration::from_millis(source.get_parsed(EnvKey::StoreTimeoutMs, 3000)?),
        })
    }
}

fn url(source: &Source<'_>, key: EnvKey) -> Result<Url, ConfigError> {
    let raw = source.get(key)?;
    Url::parse(raw.trim_end_matches('/')).map_err(|e| ConfigError::InvalidUrl {
        key: key.as_str(),
        source: e,
    })
}
