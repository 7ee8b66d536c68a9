//! Handler for short URL redirect.

use std::sync::LazyLock;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::error::AppError;
use crate::infrastructure::cache::entry_ttl;
use crate::state::AppState;

static HASH_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]+$").unwrap());

/// Redirects a short hash to its target URL.
///
/// # Endpoint
///
/// `GET /{hash}`
///
/// # Request Flow
///
/// 1. Reject anything that is not alphanumeric
/// 2. Check the redirect cache
/// 3. On a miss, resolve through the link service
/// 4. Cache the target in the background, bounded by the link's own expiry
///    (see [`fill_cache`])
/// 5. Return `302 Found`
///
/// # Errors
///
/// Returns 404 Not Found if the hash is unknown, deleted or expired.
pub async fn redirect_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if !HASH_REGEX.is_match(&hash) {
        return Err(AppError::not_found(
            "Short link not found",
            json!({ "hash": hash }),
        ));
    }

    let target = match state.cache.get_target(&hash).await {
        Some(target) => {
            debug!(%hash, "Redirect served from cache");
            target
        }
        None => {
            let link = state.link_service.resolve(&hash).await?;

            if let Some(ttl) = entry_ttl(state.web.cache_ttl, link.expires_at, Utc::now()) {
                tokio::spawn(fill_cache(
                    state.clone(),
                    hash.clone(),
                    link.redirect_url.clone(),
                    ttl,
                ));
            }

            link.redirect_url
        }
    };

    Ok((StatusCode::FOUND, [(header::LOCATION, target)]))
}

/// Stores a resolved target, then drops it again if the link went away after
/// it was resolved.
///
/// A delete invalidates the cache after its soft-delete, so a fill landing
/// after that invalidation is caught by the second lookup.
async fn fill_cache(state: AppState, hash: String, target: String, ttl: Duration) {
    state.cache.put_target(&hash, &target, ttl).await;

    if let Err(e) = state.link_service.resolve(&hash).await {
        debug!(%hash, error = %e, "Link gone after resolve, dropping cache entry");
        state.cache.invalidate(&hash).await;
    }
}
