use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;

use crate::cache::store::CoordinationStore;
use crate::models::errors::LiveError;

/// Redis-backed shared store. Entries carry their TTL via `EX`; leases are
/// taken with `SET NX EX` so mutual exclusion holds across workers.
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<redis::Client>,
}

impl RedisStore {
    pub fn new(client: Arc<redis::Client>) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::Connection, LiveError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))
    }
}

impl CoordinationStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, LiveError> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), LiveError> {
        let mut conn = self.connection().await?;
        conn.set_ex(key, value, ttl.as_secs().max(1) as usize)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), LiveError> {
        let mut conn = self.connection().await?;
        conn.del(key)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))
    }

    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LiveError> {
        let mut conn = self.connection().await?;
        let secs = ttl.as_secs().max(1);
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(owner)
            .arg("NX")
            .arg("EX")
            .arg(secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))?;
        if set.is_some() {
            return Ok(true);
        }
        // Taken: re-entrant only if we already hold it, refreshing the lease.
        let holder: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))?;
        if holder.as_deref() == Some(owner) {
            let _: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(owner)
                .arg("XX")
                .arg("EX")
                .arg(secs)
                .query_async(&mut conn)
                .await
                .map_err(|e| LiveError::CacheUnavailable(e.to_string()))?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, LiveError> {
        let mut conn = self.connection().await?;
        let holder: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))?;
        if holder.as_deref() != Some(owner) {
            return Ok(false);
        }
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| LiveError::CacheUnavailable(e.to_string()))?;
        Ok(true)
    }
}
