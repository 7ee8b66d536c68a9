//! No-op cache used when no Redis is configured.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::service::RedirectCache;

/// A cache that never stores anything. Every lookup is a miss.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (redirect caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RedirectCache for NullCache {
    async fn get_target(&self, _hash: &str) -> Option<String> {
        None
    }

    async fn put_target(&self, _hash: &str, _target: &str, _ttl: Duration) {}

    async fn invalidate(&self, _hash: &str) {}

    async fn health_check(&self) -> bool {
        true
    }
}
