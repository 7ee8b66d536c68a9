//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::domain::entities::User;
use crate::{error::AppError, state::AppState};

/// The authenticated user, inserted by [`layer`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The raw access token the request was authenticated with.
#[derive(Debug, Clone)]
pub struct CurrentToken(pub String);

/// The caller on routes that work with or without a session, inserted by
/// [`optional_layer`].
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

/// Authenticates requests using Bearer tokens from the Authorization header.
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// On success inserts [`CurrentUser`] and [`CurrentToken`] into the request
/// extensions.
///
/// # Errors
///
/// Returns `401 Unauthorized` if the header is missing or malformed, or the
/// token is unknown, revoked or expired. Storage failures pass through as 500.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let token = bearer_token(&mut parts).await.ok_or_else(|| {
        AppError::unauthorized(
            "Unauthorized",
            json!({"reason": "Authorization header is missing or invalid"}),
        )
    })?;

    let user = st
        .session_service
        .authenticate(&token)
        .await
        .map_err(as_unauthorized)?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(CurrentUser(user));
    req.extensions_mut().insert(CurrentToken(token));

    Ok(next.run(req).await)
}

/// Resolves the caller if a valid Bearer token is present, and lets the
/// request through either way with a [`Viewer`] extension.
pub async fn optional_layer(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let user = match bearer_token(&mut parts).await {
        Some(token) => match st.session_service.authenticate(&token).await {
            Ok(user) => Some(user),
            Err(e) => {
                if !e.is_credential_failure() {
                    tracing::error!(error = %e, "Access token verification failed");
                }
                None
            }
        },
        None => None,
    };

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(Viewer(user));

    next.run(req).await
}

async fn bearer_token(parts: &mut Parts) -> Option<String> {
    AuthBearer::from_request_parts(parts, &())
        .await
        .ok()
        .map(|AuthBearer(token)| token)
        .filter(|token| !token.is_empty())
}

/// Collapses unknown, revoked and expired credentials into one 401.
pub fn as_unauthorized(e: AppError) -> AppError {
    if e.is_credential_failure() {
        AppError::unauthorized("Invalid or expired token", json!({}))
    } else {
        e
    }
}
