//! Handlers for link management endpoints (create, list, update, delete).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::link::{CreateLinkRequest, LinkListResponse, LinkResponse, UpdateLinkRequest};
use crate::api::dto::pagination::{PageMeta, PaginationParams};
use crate::api::middleware::auth::{CurrentUser, Viewer};
use crate::application::services::{CreateLinkCommand, ShortLink};
use crate::domain::entities::ExpiryPolicy;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link, or returns the caller's existing one for the same URL.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/page", "ttl": "6months" }
/// ```
///
/// Signed-in callers choose `ttl` (default `3months`). Anonymous callers pass
/// the captcha gate, always get `3months`, and share one owner.
///
/// # Response Codes
///
/// - **201 Created**: a new link was issued
/// - **200 OK**: an existing link for the same owner and URL was returned
///
/// # Errors
///
/// Returns 400 Bad Request if the URL cannot be normalized or an anonymous
/// caller asks for a different ttl.
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let (owner_id, expiry) = match viewer {
        Some(user) => (user.id, payload.ttl.unwrap_or_default()),
        None => match payload.ttl {
            None | Some(ExpiryPolicy::ThreeMonths) => {
                (state.web.anonymous_user_id, ExpiryPolicy::ThreeMonths)
            }
            Some(other) => {
                return Err(AppError::bad_request(
                    "Anonymous links always expire after 3 months",
                    json!({ "ttl": other.as_str() }),
                ));
            }
        },
    };

    let short = state
        .link_service
        .create_link(CreateLinkCommand {
            owner_id,
            url: payload.url,
            expiry,
        })
        .await?;

    let status = if short.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(to_response(&state, short))))
}

/// Lists the caller's live links, newest first.
///
/// # Endpoint
///
/// `GET /api/links?page=1&page_size=25`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<LinkListResponse>, AppError> {
    let (offset, limit) = params
        .validate_and_get_offset_limit()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let (links, total) = state.link_service.list_links(user.id, limit, offset).await?;

    Ok(Json(LinkListResponse {
        items: links
            .into_iter()
            .map(|short| to_response(&state, short))
            .collect(),
        pagination: PageMeta {
            page: params.page(),
            page_size: params.page_size(),
            total,
        },
    }))
}

/// Changes the expiry policy of one of the caller's links.
///
/// # Endpoint
///
/// `PATCH /api/links/{hash}`
///
/// ```json
/// { "ttl": "never" }
/// ```
///
/// The new expiry is computed from now. The cached redirect is invalidated.
///
/// # Errors
///
/// Returns 404 Not Found if the link does not exist or belongs to someone else.
pub async fn update_link_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    let short = state
        .link_service
        .change_expiry(user.id, &hash, payload.ttl)
        .await?;

    state.cache.invalidate(&hash).await;

    Ok(Json(to_response(&state, short)))
}

/// Soft-deletes one of the caller's links.
///
/// # Endpoint
///
/// `DELETE /api/links/{hash}`
///
/// # Errors
///
/// Returns 404 Not Found if the link does not exist, is already deleted, or
/// belongs to someone else.
pub async fn delete_link_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete_link(user.id, &hash).await?;

    state.cache.invalidate(&hash).await;

    Ok(StatusCode::NO_CONTENT)
}

fn to_response(state: &AppState, short: ShortLink) -> LinkResponse {
    let short_url = state.link_service.short_url(&short.hash);
    LinkResponse::new(short, short_url)
}
