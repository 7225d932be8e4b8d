use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use redis::AsyncCommands;

use crate::cache::CacheService;
use crate::config::settings::PollerSettings;
use crate::models::errors::LiveError;
use crate::models::player::LiveStatsSnapshot;
use crate::services::broadcast::{BroadcastService, SnapshotNotice, SNAPSHOT_CHANNEL};
use crate::services::live_score_service::{snapshot_cache_key, LiveScoreService};
use crate::upstream::{Endpoint, ResilientClient};
use crate::upstream::ingest;

/// Stored snapshots outlive the gameweek's live window comfortably.
const SNAPSHOT_TTL: Duration = Duration::from_secs(6 * 3600);

/// Periodically pulls the raw live stats feed and republishes it when it
/// actually changed. One cycle never brings the service down: an upstream
/// failure falls back to the cached snapshot, then to a placeholder with a
/// degraded notice to connected clients.
#[derive(Clone)]
pub struct LivePollerService {
    client: ResilientClient,
    cache: CacheService,
    scores: LiveScoreService,
    broadcaster: BroadcastService,
    redis_client: Option<Arc<redis::Client>>,
    settings: PollerSettings,
}

impl LivePollerService {
    pub fn new(
        client: ResilientClient,
        cache: CacheService,
        scores: LiveScoreService,
        broadcaster: BroadcastService,
        redis_client: Option<Arc<redis::Client>>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            client,
            cache,
            scores,
            broadcaster,
            redis_client,
            settings,
        }
    }

    /// One poll cycle. Errors are handled inside; the scheduler only ever
    /// sees a completed cycle.
    pub async fn run_cycle(&self) {
        let gameweek = match self.scores.current_gameweek().await {
            Ok(gameweek) => gameweek,
            Err(e) => {
                tracing::warn!("Poll cycle skipped, no active gameweek: {}", e);
                return;
            }
        };

        match self.fetch_snapshot(gameweek).await {
            Ok(Some(snapshot)) => {
                let notice = SnapshotNotice {
                    gameweek,
                    content_hash: snapshot.content_hash.clone(),
                    fetched_at: snapshot.fetched_at,
                };
                self.cache
                    .set(&snapshot_cache_key(gameweek), &snapshot, SNAPSHOT_TTL)
                    .await;
                self.publish_notice(&notice).await;
            }
            Ok(None) => {
                tracing::debug!("Gameweek {} snapshot unchanged", gameweek);
            }
            Err(e) => {
                self.handle_fetch_failure(gameweek, e).await;
            }
        }
    }

    /// Fetches a fresh snapshot, returning `None` when the content hash
    /// matches what is already cached and the cache is still fresh.
    async fn fetch_snapshot(
        &self,
        gameweek: u32,
    ) -> Result<Option<LiveStatsSnapshot>, LiveError> {
        let body = self
            .client
            .fetch_json_uncached(&Endpoint::LiveEvent { gameweek })
            .await?;
        let snapshot = ingest::live_snapshot(gameweek, &body)?;

        if let Some(cached) = self
            .cache
            .get::<LiveStatsSnapshot>(&snapshot_cache_key(gameweek))
            .await
        {
            let age = Utc::now()
                .signed_duration_since(cached.fetched_at)
                .num_seconds();
            if cached.content_hash == snapshot.content_hash
                && age < self.settings.freshness_seconds as i64
            {
                return Ok(None);
            }
        }
        Ok(Some(snapshot))
    }

    /// Fallback ladder: keep serving the cached snapshot while upstream is
    /// down; with nothing cached, park a placeholder so scoring still runs,
    /// and tell clients the feed is degraded.
    async fn handle_fetch_failure(&self, gameweek: u32, error: LiveError) {
        tracing::warn!("Live fetch failed for gameweek {}: {}", gameweek, error);
        if self
            .cache
            .get::<LiveStatsSnapshot>(&snapshot_cache_key(gameweek))
            .await
            .is_some()
        {
            return;
        }

        let placeholder = LiveStatsSnapshot::placeholder(gameweek);
        self.cache
            .set(&snapshot_cache_key(gameweek), &placeholder, SNAPSHOT_TTL)
            .await;
        let message = format!(
            "Live data for gameweek {} is temporarily unavailable; scores may be incomplete",
            gameweek
        );
        self.broadcaster.notify_degraded(&message).await;
        if let Some(redis_client) = &self.redis_client {
            if let Ok(mut conn) = redis_client.get_async_connection().await {
                let _: Result<(), redis::RedisError> = conn
                    .publish(crate::services::broadcast::DEGRADED_CHANNEL, &message)
                    .await;
            }
        }
    }

    /// Publishes the changed-snapshot notice to every worker; without Redis
    /// the local broadcaster is notified directly.
    async fn publish_notice(&self, notice: &SnapshotNotice) {
        tracing::info!(
            "Gameweek {} snapshot changed (hash {})",
            notice.gameweek,
            &notice.content_hash[..notice.content_hash.len().min(12)]
        );
        let published = if let Some(redis_client) = &self.redis_client {
            match redis_client.get_async_connection().await {
                Ok(mut conn) => {
                    let payload = match serde_json::to_string(notice) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!("Failed to serialize snapshot notice: {}", e);
                            return;
                        }
                    };
                    let result: Result<(), redis::RedisError> =
                        conn.publish(SNAPSHOT_CHANNEL, payload).await;
                    match result {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("Snapshot notice publish failed: {}", e);
                            false
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable for snapshot notice: {}", e);
                    false
                }
            }
        } else {
            false
        };

        // The worker that fetched still fans out locally when pub/sub is
        // out of the picture.
        if !published {
            self.broadcaster.notify_snapshot(notice.gameweek).await;
        }
    }
}
