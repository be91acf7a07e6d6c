use std::env;
use std::str::FromStr;

use super::settings::ConfigError;

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    AdServerUrl,
    AssetServerUrl,
    OutputBucketUrl,
    EncoreUrl,
    EncoreProfile,
    RootUrl,
    OscAccessToken,
    RedisUrl,
    KeyField,
    KeyRegex,
    JitPackage,
    PackagingQueue,
    InFlightTtl,
    UpstreamTimeoutMs,
    StoreTimeoutMs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::AdServerUrl => "AD_SERVER_URL",
            EnvKey::AssetServerUrl => "ASSET_SERVER_URL",
            EnvKey::OutputBucketUrl => "OUTPUT_BUCKET_URL",
            EnvKey::EncoreUrl => "ENCORE_URL",
            EnvKey::EncoreProfile => "ENCORE_PROFILE",
            EnvKey::RootUrl => "ROOT_URL",
            EnvKey::OscAccessToken => "OSC_ACCESS_TOKEN",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::KeyField => "KEY_FIELD",
            EnvKey::KeyRegex => "KEY_REGEX",
            EnvKey::JitPackage => "JIT_PACKAGE",
            EnvKey::PackagingQueue => "PACKAGING_QUEUE",
            EnvKey::InFlightTtl => "IN_FLIGHT_TTL",
            EnvKey::UpstreamTimeoutMs => "UPSTREAM_TIMEOUT_MS",
            EnvKey::StoreTimeoutMs => "STORE_TIMEOUT_MS",
        }
    }
}

/// Where variables come from: the process environment, or a closure in tests.
pub struct Source<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Source<'a> {
    pub fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    /// Set and non-empty.
    pub fn optional(&self, key: EnvKey) -> Option<String> {
        (self.lookup)(key.as_str())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn get(&self, key: EnvKey) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key.as_str()))
    }

    pub fn get_or(&self, key: EnvKey, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_parsed<T: FromStr>(&self, key: EnvKey, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(val) => val.parse::<T>().map_err(|_| ConfigError::Invalid {
                key: key.as_str(),
                value: val,
            }),
            None => Ok(default),
        }
    }
}

pub fn process_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}
