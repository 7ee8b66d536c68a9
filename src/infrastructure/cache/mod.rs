//! Redirect-target caching.
//!
//! - [`RedisCache`] - Redis-backed cache
//! - [`NullCache`] - No-op implementation when no Redis is configured

mod null_cache;
mod redis_cache;
mod service;

pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, RedirectCache, entry_ttl};
