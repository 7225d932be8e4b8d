use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::redis_store::RedisStore;
use crate::cache::store::{CoordinationStore, MemoryStore, SharedStore};

/// Shared-tier hits are re-inserted into the memory tier with this TTL;
/// the entry's remaining shared TTL is not recoverable.
const BACKFILL_TTL: Duration = Duration::from_secs(30);

/// Tiered typed cache: an in-process memory tier in front of an optional
/// shared Redis tier. Reads fall through memory to the shared tier and
/// backfill the memory tier; writes go to both. A failing shared tier
/// degrades to memory-only operation with a warning, never an error on
/// this path.
#[derive(Clone)]
pub struct CacheService {
    memory: MemoryStore,
    shared: Option<SharedStore>,
}

impl CacheService {
    pub fn new(redis: Option<RedisStore>) -> Self {
        Self {
            memory: MemoryStore::new(),
            shared: redis.map(SharedStore::Redis),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    #[cfg(test)]
    fn with_shared_tier(shared: SharedStore) -> Self {
        Self {
            memory: MemoryStore::new(),
            shared: Some(shared),
        }
    }

    /// The store locks and leader election should run against: the shared
    /// tier when present, the process-local tier otherwise.
    pub fn coordination_store(&self) -> SharedStore {
        match &self.shared {
            Some(shared) => shared.clone(),
            None => SharedStore::Memory(self.memory.clone()),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Ok(Some(raw)) = self.memory.get_raw(key).await {
            match serde_json::from_str(&raw) {
                Ok(value) => return Some(value),
                Err(e) => {
                    tracing::warn!("Discarding undecodable memory cache entry {}: {}", key, e);
                    let _ = self.memory.delete(key).await;
                }
            }
        }
        let shared = self.shared.as_ref()?;
        match shared.get_raw(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    if let Err(e) = self.memory.set_raw(key, &raw, BACKFILL_TTL).await {
                        tracing::warn!("Memory backfill failed for {}: {}", key, e);
                    }
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable shared cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Shared cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to serialize cache value for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.memory.set_raw(key, &raw, ttl).await {
            tracing::warn!("Memory cache write failed for {}: {}", key, e);
        }
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.set_raw(key, &raw, ttl).await {
                tracing::warn!("Shared cache write failed for {}: {}", key, e);
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        let _ = self.memory.delete(key).await;
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.delete(key).await {
                tracing::warn!("Shared cache delete failed for {}: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        points: i32,
    }

    #[tokio::test]
    async fn typed_round_trip_through_memory_tier() {
        let cache = CacheService::in_memory();
        cache
            .set("score:1", &Payload { points: 42 }, Duration::from_secs(30))
            .await;
        let got: Option<Payload> = cache.get("score:1").await;
        assert_eq!(got, Some(Payload { points: 42 }));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = CacheService::in_memory();
        cache
            .set("score:1", &Payload { points: 1 }, Duration::from_secs(5))
            .await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let got: Option<Payload> = cache.get("score:1").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn shared_tier_hits_backfill_the_memory_tier() {
        let shared = MemoryStore::new();
        let cache = CacheService::with_shared_tier(SharedStore::Memory(shared.clone()));
        shared
            .set_raw("score:9", r#"{"points":9}"#, Duration::from_secs(60))
            .await
            .unwrap();

        let got: Option<Payload> = cache.get("score:9").await;
        assert_eq!(got, Some(Payload { points: 9 }));

        // Still served after the shared entry vanishes: the hit landed in
        // the memory tier.
        shared.delete("score:9").await.unwrap();
        let again: Option<Payload> = cache.get("score:9").await;
        assert_eq!(again, Some(Payload { points: 9 }));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = CacheService::in_memory();
        cache
            .set("k", &Payload { points: 7 }, Duration::from_secs(60))
            .await;
        cache.delete("k").await;
        let got: Option<Payload> = cache.get("k").await;
        assert_eq!(got, None);
    }
}
