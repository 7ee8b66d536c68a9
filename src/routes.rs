//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{hash}`      - Short link redirect (public)
//! - `GET  /health`      - Health check: storage and cache (public)
//! - `/api/links*`       - Link management
//! - `/api/auth/*`       - OAuth flow and sessions
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket, stricter on auth routes
//! - **Authentication** - Bearer token, required or optional per route
//! - **Path normalization** - Trailing slash handling

use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::rate_limit::{self, Tier};
use crate::api::middleware::tracing;
use crate::state::AppState;

/// Constructs the production router.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   forwarding headers instead of the peer socket address; enable only when
///   the service runs behind a trusted reverse proxy
pub fn app_router(state: AppState, behind_proxy: bool) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(compose(state, Some(behind_proxy)))
}

/// The same routes without rate limiting, which needs peer addresses that
/// in-process test transports do not provide.
pub fn build_router(state: AppState) -> Router {
    compose(state, None)
}

fn compose(state: AppState, limits: Option<bool>) -> Router {
    let limit = |router: Router<AppState>, tier: Tier| match limits {
        Some(behind_proxy) => rate_limit::apply(router, behind_proxy, tier),
        None => router,
    };

    let api_router = Router::new()
        .merge(limit(api::routes::link_routes(state.clone()), Tier::Public))
        .merge(limit(api::routes::auth_routes(state.clone()), Tier::Secure));

    let public = Router::new()
        .route("/{hash}", get(redirect_handler))
        .route("/health", get(health_handler));

    Router::new()
        .merge(limit(public, Tier::Public))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer())
}
