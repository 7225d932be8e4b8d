use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::models::errors::LiveError;
use crate::models::live_messages::ServerMessage;
use crate::services::live_score_service::LiveScoreService;

/// Coalescing window for per-manager recomputation.
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Redis channel carrying cross-worker snapshot notifications.
pub const SNAPSHOT_CHANNEL: &str = "live:events:snapshot";
/// Redis channel carrying degraded-service notices.
pub const DEGRADED_CHANNEL: &str = "live:events:degraded";

pub type SessionId = Uuid;

/// Cross-worker notification payload published by whichever poller fetched
/// a changed snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotNotice {
    pub gameweek: u32,
    pub content_hash: String,
    pub fetched_at: DateTime<Utc>,
}

struct BroadcastInner {
    sessions: RwLock<HashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>>,
    subscriptions: RwLock<HashMap<(i64, u32), HashSet<SessionId>>>,
    /// (manager, gameweek) pairs with a pending debounced recompute.
    pending: Mutex<HashSet<(i64, u32)>>,
    /// Snapshot timestamp last pushed per (manager, gameweek); pushes never
    /// regress behind it.
    last_pushed: RwLock<HashMap<(i64, u32), DateTime<Utc>>>,
    scores: LiveScoreService,
}

/// Owns the subscription registry and drives delta pushes: on every changed
/// snapshot, recomputes only the managers someone is subscribed to, one
/// debounced task per manager, and fans the result out to that manager's
/// sessions.
#[derive(Clone)]
pub struct BroadcastService {
    inner: Arc<BroadcastInner>,
}

impl BroadcastService {
    pub fn new(scores: LiveScoreService) -> Self {
        Self {
            inner: Arc::new(BroadcastInner {
                sessions: RwLock::new(HashMap::new()),
                subscriptions: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashSet::new()),
                last_pushed: RwLock::new(HashMap::new()),
                scores,
            }),
        }
    }

    /// Registers a connection and returns the channel its pushes arrive on.
    pub async fn register(&self, session_id: SessionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.sessions.write().await.insert(session_id, tx);
        tracing::info!("Session {} connected", session_id);
        rx
    }

    /// The initialization message for a fresh connection: latest known
    /// snapshot state for the active gameweek.
    pub async fn init_message(&self) -> ServerMessage {
        match self.inner.scores.current_gameweek().await {
            Ok(gameweek) => {
                let snapshot = self.inner.scores.snapshot(gameweek).await.ok();
                ServerMessage::Init {
                    gameweek,
                    degraded: snapshot
                        .as_ref()
                        .map(|s| s.is_placeholder())
                        .unwrap_or(true),
                    snapshot,
                }
            }
            Err(_) => ServerMessage::Init {
                gameweek: 0,
                snapshot: None,
                degraded: true,
            },
        }
    }

    pub async fn subscribe(
        &self,
        session_id: SessionId,
        manager_id: i64,
        gameweek: u32,
    ) -> Result<(), LiveError> {
        if manager_id <= 0 || gameweek == 0 {
            return Err(LiveError::ValidationError(
                "subscribe requires a positive manager_id and gameweek".into(),
            ));
        }
        self.inner
            .subscriptions
            .write()
            .await
            .entry((manager_id, gameweek))
            .or_default()
            .insert(session_id);
        tracing::info!(
            "Session {} subscribed to manager {} gameweek {}",
            session_id,
            manager_id,
            gameweek
        );
        // First update immediately; later ones ride the poll cycle.
        self.schedule_recompute(manager_id, gameweek).await;
        Ok(())
    }

    pub async fn unsubscribe(&self, session_id: SessionId, manager_id: i64, gameweek: u32) {
        let mut subscriptions = self.inner.subscriptions.write().await;
        if let Some(sessions) = subscriptions.get_mut(&(manager_id, gameweek)) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                subscriptions.remove(&(manager_id, gameweek));
            }
        }
    }

    /// Tears down a closed connection and all of its subscriptions.
    pub async fn disconnect(&self, session_id: SessionId) {
        self.inner.sessions.write().await.remove(&session_id);
        let mut subscriptions = self.inner.subscriptions.write().await;
        subscriptions.retain(|_, sessions| {
            sessions.remove(&session_id);
            !sessions.is_empty()
        });
        tracing::info!("Session {} disconnected", session_id);
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().await.len()
    }

    /// A changed snapshot for `gameweek`: recompute every subscribed
    /// manager of that gameweek. The key set is snapshotted before
    /// iteration so concurrent (un)subscribes stay safe.
    pub async fn notify_snapshot(&self, gameweek: u32) {
        let keys: Vec<(i64, u32)> = self
            .inner
            .subscriptions
            .read()
            .await
            .keys()
            .filter(|(_, gw)| *gw == gameweek)
            .copied()
            .collect();
        tracing::debug!(
            "Snapshot notice for gameweek {}: {} subscribed managers",
            gameweek,
            keys.len()
        );
        for (manager_id, gw) in keys {
            self.schedule_recompute(manager_id, gw).await;
        }
    }

    /// Pushes a degraded-service notice to every connected session.
    pub async fn notify_degraded(&self, message: &str) {
        let sessions = self.inner.sessions.read().await;
        for tx in sessions.values() {
            let _ = tx.send(ServerMessage::Degraded {
                message: message.to_string(),
            });
        }
    }

    /// Debounced recompute: rapid successive triggers for one manager
    /// coalesce into a single task per window.
    async fn schedule_recompute(&self, manager_id: i64, gameweek: u32) {
        {
            let mut pending = self.inner.pending.lock().await;
            if !pending.insert((manager_id, gameweek)) {
                return;
            }
        }
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_WINDOW).await;
            this.inner
                .pending
                .lock()
                .await
                .remove(&(manager_id, gameweek));
            this.recompute_and_push(manager_id, gameweek).await;
        });
    }

    async fn recompute_and_push(&self, manager_id: i64, gameweek: u32) {
        // Abandon early if everyone unsubscribed while we were debouncing.
        if !self
            .inner
            .subscriptions
            .read()
            .await
            .contains_key(&(manager_id, gameweek))
        {
            return;
        }

        let snapshot_at = match self.inner.scores.snapshot(gameweek).await {
            Ok(snapshot) => snapshot.fetched_at,
            Err(_) => Utc::now(),
        };
        {
            // Never push data older than what subscribers already saw.
            let last_pushed = self.inner.last_pushed.read().await;
            if let Some(last) = last_pushed.get(&(manager_id, gameweek)) {
                if snapshot_at < *last {
                    tracing::debug!(
                        "Skipping stale push for manager {} gameweek {}",
                        manager_id,
                        gameweek
                    );
                    return;
                }
            }
        }

        let (score, estimated_rank) = match self.inner.scores.live_score(manager_id, gameweek).await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    "Recompute failed for manager {} gameweek {}: {}",
                    manager_id,
                    gameweek,
                    e
                );
                return;
            }
        };

        let update = ServerMessage::LiveUpdate {
            manager_id,
            gameweek,
            picks: score.picks,
            auto_subs: score.auto_subs,
            total_points: score.total_points,
            transfer_penalty: score.transfer_penalty,
            estimated_rank,
            computed_at: score.computed_at,
        };

        // Snapshot the target set, then deliver; sessions that closed
        // mid-computation just drop the send.
        let targets: Vec<SessionId> = self
            .inner
            .subscriptions
            .read()
            .await
            .get(&(manager_id, gameweek))
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default();
        if targets.is_empty() {
            return;
        }

        let sessions = self.inner.sessions.read().await;
        let mut delivered = 0;
        for session_id in targets {
            if let Some(tx) = sessions.get(&session_id) {
                if tx.send(update.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        drop(sessions);

        self.inner
            .last_pushed
            .write()
            .await
            .insert((manager_id, gameweek), snapshot_at);
        tracing::debug!(
            "Pushed live update for manager {} gameweek {} to {} sessions",
            manager_id,
            gameweek,
            delivered
        );
    }

    /// Bridges cross-worker Redis notifications into local recomputes, the
    /// same pub/sub pattern the connection actors use for delivery in a
    /// single-worker setup.
    pub fn start_redis_listener(&self, redis_client: Arc<redis::Client>) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match redis_client.get_async_connection().await {
                    Ok(conn) => {
                        let mut pubsub = conn.into_pubsub();
                        if let Err(e) = pubsub.subscribe(SNAPSHOT_CHANNEL).await {
                            tracing::error!("Failed to subscribe to {}: {}", SNAPSHOT_CHANNEL, e);
                        }
                        if let Err(e) = pubsub.subscribe(DEGRADED_CHANNEL).await {
                            tracing::error!("Failed to subscribe to {}: {}", DEGRADED_CHANNEL, e);
                        }
                        let mut stream = pubsub.on_message();
                        while let Some(msg) = stream.next().await {
                            let channel = msg.get_channel_name().to_string();
                            let payload: String = match msg.get_payload() {
                                Ok(payload) => payload,
                                Err(e) => {
                                    tracing::warn!("Undecodable pub/sub payload: {}", e);
                                    continue;
                                }
                            };
                            if channel == SNAPSHOT_CHANNEL {
                                match serde_json::from_str::<SnapshotNotice>(&payload) {
                                    Ok(notice) => this.notify_snapshot(notice.gameweek).await,
                                    Err(e) => {
                                        tracing::warn!("Bad snapshot notice: {}", e)
                                    }
                                }
                            } else {
                                this.notify_degraded(&payload).await;
                            }
                        }
                        tracing::warn!("Redis pub/sub stream ended; reconnecting");
                    }
                    Err(e) => {
                        tracing::error!("Redis pub/sub connection failed: {}", e);
                    }
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
    }
}
