use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::CacheService;
use crate::config::upstream::UpstreamSettings;
use crate::models::errors::LiveError;
use crate::upstream::endpoints::Endpoint;
use crate::upstream::schema;

/// Identities rotated through after a 403; the upstream source blocks
/// long-lived anonymous clients.
const CLIENT_IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Single shared primitive for all upstream calls: bounded retries with
/// exponential backoff + jitter, rate-limit awareness, identity rotation on
/// 403, schema validation, and a short-TTL response cache that absorbs
/// duplicate calls.
#[derive(Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    settings: UpstreamSettings,
    cache: CacheService,
    identity: Arc<RwLock<String>>,
}

impl ResilientClient {
    pub fn new(settings: UpstreamSettings, cache: CacheService) -> Result<Self, LiveError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| LiveError::UpstreamUnavailable(format!("http client init: {}", e)))?;
        let identity = CLIENT_IDENTITIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(CLIENT_IDENTITIES[0])
            .to_string();
        Ok(Self {
            http,
            settings,
            cache,
            identity: Arc::new(RwLock::new(identity)),
        })
    }

    /// Fetches and validates one endpoint, serving repeats from the
    /// short-TTL response cache.
    pub async fn fetch_json(&self, endpoint: &Endpoint) -> Result<Value, LiveError> {
        let cache_key = endpoint.cache_key();
        if let Some(cached) = self.cache.get::<Value>(&cache_key).await {
            tracing::debug!("Upstream cache hit for {}", endpoint.path());
            return Ok(cached);
        }

        let body = self.fetch_with_retries(endpoint).await?;
        self.cache
            .set(&cache_key, &body, self.settings.response_cache_ttl())
            .await;
        Ok(body)
    }

    /// Same as `fetch_json` but bypasses the response cache; the poller uses
    /// this so freshness decisions stay its own.
    pub async fn fetch_json_uncached(&self, endpoint: &Endpoint) -> Result<Value, LiveError> {
        self.fetch_with_retries(endpoint).await
    }

    async fn fetch_with_retries(&self, endpoint: &Endpoint) -> Result<Value, LiveError> {
        let url = endpoint.url(&self.settings.base_url()?)?;
        let mut last_error = String::new();
        let mut rate_limit_wait: Option<Duration> = None;

        for attempt in 0..=self.settings.max_retries {
            if let Some(delay) = attempt_delay(
                attempt,
                rate_limit_wait.take(),
                self.settings.base_backoff(),
            ) {
                tokio::time::sleep(delay).await;
            }

            let identity = self.identity.read().await.clone();
            let response = self
                .http
                .get(url.clone())
                .header(reqwest::header::USER_AGENT, identity)
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("network error: {}", e);
                    tracing::warn!(
                        "Upstream fetch {} attempt {} failed: {}",
                        endpoint.path(),
                        attempt + 1,
                        last_error
                    );
                    continue;
                }
            };

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    let delay = retry_after(&response)
                        .unwrap_or_else(|| self.settings.rate_limit_backoff());
                    last_error = format!("rate limited, backing off {:?}", delay);
                    tracing::warn!("Upstream rate limited on {}: waiting {:?}", endpoint.path(), delay);
                    rate_limit_wait = Some(delay);
                    continue;
                }
                StatusCode::FORBIDDEN => {
                    self.rotate_identity().await;
                    last_error = "403 forbidden, rotated client identity".to_string();
                    continue;
                }
                StatusCode::NOT_FOUND => {
                    return Err(LiveError::NotFound(endpoint.path()));
                }
                status if status.is_server_error() => {
                    last_error = format!("upstream {}", status);
                    tracing::warn!(
                        "Upstream {} on {} attempt {}",
                        status,
                        endpoint.path(),
                        attempt + 1
                    );
                    continue;
                }
                status if !status.is_success() => {
                    return Err(LiveError::UpstreamUnavailable(format!(
                        "unexpected status {} from {}",
                        status,
                        endpoint.path()
                    )));
                }
                _ => {}
            }

            let body = match response.json::<Value>().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = format!("undecodable body: {}", e);
                    continue;
                }
            };

            // A structurally invalid response is treated as retryable: the
            // upstream source occasionally serves maintenance payloads.
            match schema::validate(endpoint, &body) {
                Ok(()) => return Ok(body),
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        "Schema validation failed for {} attempt {}: {}",
                        endpoint.path(),
                        attempt + 1,
                        last_error
                    );
                    continue;
                }
            }
        }

        Err(LiveError::UpstreamUnavailable(format!(
            "{} after {} attempts: {}",
            endpoint.path(),
            self.settings.max_retries + 1,
            last_error
        )))
    }

    async fn rotate_identity(&self) {
        let current = self.identity.read().await.clone();
        let candidates: Vec<&&str> = CLIENT_IDENTITIES
            .iter()
            .filter(|id| **id != current)
            .collect();
        let next = candidates
            .choose(&mut rand::thread_rng())
            .map(|id| id.to_string())
            .unwrap_or_else(|| CLIENT_IDENTITIES[0].to_string());
        *self.identity.write().await = next;
        tracing::info!("Rotated upstream client identity");
    }
}

/// Pre-attempt wait. A rate-limit delay carried over from the previous
/// attempt replaces the exponential backoff, so a 429 costs exactly one
/// sleep.
fn attempt_delay(attempt: u32, rate_limit_wait: Option<Duration>, base: Duration) -> Option<Duration> {
    match rate_limit_wait {
        Some(delay) => Some(delay),
        None if attempt > 0 => Some(backoff_delay(base, attempt)),
        None => None,
    }
}

/// Exponential backoff with full jitter.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp.min(Duration::from_secs(30));
    let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64 / 2);
    capped + Duration::from_millis(jitter_ms)
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempts() {
        let base = Duration::from_millis(200);
        let first = backoff_delay(base, 1);
        let third = backoff_delay(base, 3);
        assert!(first >= Duration::from_millis(200));
        assert!(third >= Duration::from_millis(800));
    }

    #[test]
    fn first_attempt_starts_without_delay() {
        assert_eq!(attempt_delay(0, None, Duration::from_millis(200)), None);
    }

    #[test]
    fn rate_limit_wait_replaces_the_backoff() {
        let delay = attempt_delay(3, Some(Duration::from_secs(90)), Duration::from_millis(200));
        assert_eq!(delay, Some(Duration::from_secs(90)));
    }

    #[test]
    fn backoff_is_capped() {
        let base = Duration::from_millis(500);
        let late = backoff_delay(base, 20);
        assert!(late <= Duration::from_secs(45));
    }
}
