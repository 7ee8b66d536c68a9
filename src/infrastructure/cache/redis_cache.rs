//! Redis-backed redirect cache.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, warn};

use super::service::{CacheError, CacheResult, RedirectCache};

const KEY_PREFIX: &str = "redirect:";

/// Uses a `ConnectionManager`, which reconnects on its own after failures.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection
    /// cannot be established, or the PING fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("Failed to create Redis client: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {e}")))?;

        conn.clone()
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {e}")))?;

        info!("Connected to Redis");

        Ok(Self { conn })
    }

    fn key(hash: &str) -> String {
        format!("{KEY_PREFIX}{hash}")
    }
}

#[async_trait]
impl RedirectCache for RedisCache {
    async fn get_target(&self, hash: &str) -> Option<String> {
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<String>>(Self::key(hash)).await {
            Ok(hit) => {
                debug!(hash, hit = hit.is_some(), "Redirect cache lookup");
                hit
            }
            Err(e) => {
                warn!(hash, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn put_target(&self, hash: &str, target: &str, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut conn = self.conn.clone();

        if let Err(e) = conn
            .set_ex::<_, _, ()>(Self::key(hash), target, ttl.as_secs())
            .await
        {
            warn!(hash, error = %e, "Redis SET failed");
        }
    }

    async fn invalidate(&self, hash: &str) {
        let mut conn = self.conn.clone();

        match conn.del::<_, i32>(Self::key(hash)).await {
            Ok(deleted) if deleted > 0 => debug!(hash, "Redirect cache entry invalidated"),
            Ok(_) => {}
            Err(e) => warn!(hash, error = %e, "Redis DEL failed"),
        }
    }

    async fn health_check(&self) -> bool {
        self.conn.clone().ping::<()>().await.is_ok()
    }
}
