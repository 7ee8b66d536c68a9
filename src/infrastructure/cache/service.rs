//! Redirect cache port and error types.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while setting up a cache backend.
///
/// Runtime operations never surface these: a failing cache degrades to a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Caches `hash -> redirect target` for resolvable links.
///
/// Implementations are fail-open: lookups that error are logged and reported
/// as misses, writes and invalidations that error are logged and dropped.
#[async_trait]
pub trait RedirectCache: Send + Sync {
    async fn get_target(&self, hash: &str) -> Option<String>;

    /// Stores a target for at most `ttl`. A zero `ttl` stores nothing.
    async fn put_target(&self, hash: &str, target: &str, ttl: Duration);

    /// Drops the entry for `hash`. Called when a link is deleted or its expiry changes.
    async fn invalidate(&self, hash: &str);

    async fn health_check(&self) -> bool;
}

/// Bounds the cache lifetime of an entry by the link's own expiry.
///
/// Returns `None` when the link is already expired and must not be cached.
pub fn entry_ttl(
    max_ttl: Duration,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let Some(expires_at) = expires_at else {
        return Some(max_ttl);
    };

    let remaining = (expires_at - now).to_std().ok()?;
    let ttl = remaining.min(max_ttl);
    (ttl.as_secs() > 0).then_some(Duration::from_secs(ttl.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_entry_ttl_for_never_expiring_link() {
        assert_eq!(entry_ttl(HOUR, None, Utc::now()), Some(HOUR));
    }

    #[test]
    fn test_entry_ttl_bounded_by_expiry() {
        let now = Utc::now();

        assert_eq!(
            entry_ttl(HOUR, Some(now + TimeDelta::seconds(90)), now),
            Some(Duration::from_secs(90))
        );
        assert_eq!(entry_ttl(HOUR, Some(now + TimeDelta::days(30)), now), Some(HOUR));
    }

    #[test]
    fn test_entry_ttl_none_when_expired_or_sub_second() {
        let now = Utc::now();

        assert_eq!(entry_ttl(HOUR, Some(now - TimeDelta::seconds(1)), now), None);
        assert_eq!(entry_ttl(HOUR, Some(now + TimeDelta::milliseconds(400)), now), None);
    }
}
