//! Per-IP rate limiting using a token bucket.

use axum::Router;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Limits applied to a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Redirects and link creation: 2 req/s, burst 100.
    Public,
    /// Authentication endpoints: 1 req/s, burst 10.
    Secure,
}

impl Tier {
    fn quota(self) -> (u64, u32) {
        match self {
            Tier::Public => (2, 100),
            Tier::Secure => (1, 10),
        }
    }
}

/// Wraps `router` in a rate limiter for `tier`.
///
/// Behind a trusted proxy the client IP is read from `X-Forwarded-For`,
/// `X-Real-IP` or `Forwarded`; otherwise from the socket peer address, which
/// requires the server to be started with connect info.
pub fn apply<S>(router: Router<S>, behind_proxy: bool, tier: Tier) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if behind_proxy {
        match governor(SmartIpKeyExtractor, tier) {
            Some(layer) => router.layer(layer),
            None => router,
        }
    } else {
        match governor(PeerIpKeyExtractor, tier) {
            Some(layer) => router.layer(layer),
            None => router,
        }
    }
}

fn governor<K>(
    key: K,
    tier: Tier,
) -> Option<GovernorLayer<K, NoOpMiddleware<QuantaInstant>, axum::body::Body>>
where
    K: KeyExtractor,
{
    let (per_second, burst) = tier.quota();

    let Some(config) = GovernorConfigBuilder::default()
        .key_extractor(key)
        .per_second(per_second)
        .burst_size(burst)
        .finish()
    else {
        tracing::error!(?tier, "Invalid rate limit quota, limiter disabled");
        return None;
    };

    Some(GovernorLayer::new(Arc::new(config)))
}
