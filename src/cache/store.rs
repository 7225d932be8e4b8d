use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::errors::LiveError;

/// Shared key/value + lease-lock operations the coordination layer needs.
/// Implementable over any shared store; `RedisStore` backs it in production
/// and `MemoryStore` backs single-process use and tests.
#[allow(async_fn_in_trait)]
pub trait CoordinationStore: Clone + Send + Sync + 'static {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, LiveError>;
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), LiveError>;
    async fn delete(&self, key: &str) -> Result<(), LiveError>;
    /// Lease acquisition: succeeds only if the key is absent, expired, or
    /// already held by the same owner (which refreshes the lease).
    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LiveError>;
    /// Releases the lease if held by `owner`; returns whether it was held.
    async fn release(&self, key: &str, owner: &str) -> Result<bool, LiveError>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: Instant,
    owner: Option<String>,
    created_at: DateTime<Utc>,
    access_count: u64,
}

/// In-process TTL store. Expired entries are reclaimed lazily on access
/// rather than swept.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn metadata(&self, key: &str) -> Option<(DateTime<Utc>, u64)> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| (e.created_at, e.access_count))
    }
}

impl CoordinationStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, LiveError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                entry.access_count += 1;
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), LiveError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
                owner: None,
                created_at: Utc::now(),
                access_count: 0,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), LiveError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LiveError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let free = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                entry.owner.as_deref() == Some(owner)
            }
            _ => true,
        };
        if free {
            entries.insert(
                key.to_string(),
                StoredEntry {
                    value: owner.to_string(),
                    expires_at: now + ttl,
                    owner: Some(owner.to_string()),
                    created_at: Utc::now(),
                    access_count: 0,
                },
            );
        }
        Ok(free)
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, LiveError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry)
                if entry.owner.as_deref() == Some(owner) && entry.expires_at > Instant::now() =>
            {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Concrete store handed to services so spawned tasks stay object-safe and
/// `Send` without generics leaking through the service layer.
#[derive(Clone)]
pub enum SharedStore {
    Memory(MemoryStore),
    Redis(super::redis_store::RedisStore),
}

impl CoordinationStore for SharedStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, LiveError> {
        match self {
            SharedStore::Memory(s) => s.get_raw(key).await,
            SharedStore::Redis(s) => s.get_raw(key).await,
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), LiveError> {
        match self {
            SharedStore::Memory(s) => s.set_raw(key, value, ttl).await,
            SharedStore::Redis(s) => s.set_raw(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), LiveError> {
        match self {
            SharedStore::Memory(s) => s.delete(key).await,
            SharedStore::Redis(s) => s.delete(key).await,
        }
    }

    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LiveError> {
        match self {
            SharedStore::Memory(s) => s.acquire(key, owner, ttl).await,
            SharedStore::Redis(s) => s.acquire(key, owner, ttl).await,
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, LiveError> {
        match self {
            SharedStore::Memory(s) => s.release(key, owner).await,
            SharedStore::Redis(s) => s.release(key, owner).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_value_until_ttl() {
        let store = MemoryStore::new();
        store
            .set_raw("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get_raw("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get_raw("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn access_count_is_tracked() {
        let store = MemoryStore::new();
        store
            .set_raw("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        store.get_raw("k").await.unwrap();
        store.get_raw("k").await.unwrap();
        let (_, count) = store.metadata("k").await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn lease_is_exclusive_until_expiry() {
        let store = MemoryStore::new();
        assert!(store
            .acquire("lock", "a", Duration::from_secs(5))
            .await
            .unwrap());
        assert!(!store
            .acquire("lock", "b", Duration::from_secs(5))
            .await
            .unwrap());
        // Re-entrant for the same owner.
        assert!(store
            .acquire("lock", "a", Duration::from_secs(5))
            .await
            .unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store
            .acquire("lock", "b", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn release_only_succeeds_for_owner() {
        let store = MemoryStore::new();
        store
            .acquire("lock", "a", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!store.release("lock", "b").await.unwrap());
        assert!(store.release("lock", "a").await.unwrap());
        assert!(store
            .acquire("lock", "b", Duration::from_secs(60))
            .await
            .unwrap());
    }
}
