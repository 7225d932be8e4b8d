use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::models::errors::LiveError;

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub rate_limit_backoff_seconds: u64,
    pub response_cache_ttl_seconds: u64,
}

impl UpstreamSettings {
    pub fn base_url(&self) -> Result<Url, LiveError> {
        Url::parse(&self.base_url)
            .map_err(|e| LiveError::ValidationError(format!("invalid upstream base url: {}", e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_seconds)
    }

    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.response_cache_ttl_seconds)
    }
}
