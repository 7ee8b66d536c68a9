//! Handlers for the OAuth flow and session endpoints.

use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::api::dto::auth::{AuthResponse, OAuthCallbackParams, RefreshRequest, UserResponse};
use crate::api::middleware::auth::{CurrentToken, CurrentUser, as_unauthorized};
use crate::application::services::{AuthSession, FinishOAuthCommand};
use crate::domain::entities::ProviderKind;
use crate::error::AppError;
use crate::state::{AppState, WebSettings};
use crate::utils::secret::{STATE_BYTES, random_secret};

pub const STATE_COOKIE: &str = "oauth_state";
const STATE_COOKIE_MAX_AGE: time::Duration = time::Duration::minutes(5);

/// Lists the identity providers that are currently enabled.
///
/// # Endpoint
///
/// `GET /api/auth/providers`
pub async fn providers_handler(State(state): State<AppState>) -> Json<Vec<ProviderKind>> {
    Json(state.oauth_service.providers())
}

/// Starts an authorization flow.
///
/// # Endpoint
///
/// `GET /api/auth/{provider}`
///
/// Sets a short-lived `oauth_state` cookie and redirects (302) to the provider.
///
/// # Errors
///
/// Returns 400 Bad Request for unknown or disabled providers.
pub async fn oauth_start_handler(
    Path(provider): Path<String>,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let kind = parse_provider(&provider)?;
    let oauth_state = random_secret(STATE_BYTES)?;

    let url = state.oauth_service.authorization_url(kind, &oauth_state)?;

    let jar = jar.add(state_cookie(&state.web, oauth_state));

    Ok((jar, found(&url)).into_response())
}

/// Provider callback delivered as a query string.
///
/// # Endpoint
///
/// `GET /api/auth/{provider}/callback`
pub async fn oauth_callback_handler(
    Path(provider): Path<String>,
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> Response {
    complete_callback(&state, &provider, jar, params).await
}

/// Provider callback delivered as a form post (Apple's `response_mode=form_post`).
///
/// # Endpoint
///
/// `POST /api/auth/{provider}/callback`
pub async fn oauth_callback_form_handler(
    Path(provider): Path<String>,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(params): Form<OAuthCallbackParams>,
) -> Response {
    complete_callback(&state, &provider, jar, params).await
}

/// Validates the state cookie, finishes the flow and redirects to a landing page.
///
/// On success the credential pair is placed in the URL fragment of the
/// success page, so it never reaches a server log. Every failure redirects to
/// the failure page with a short `error` reason.
async fn complete_callback(
    state: &AppState,
    provider: &str,
    jar: CookieJar,
    params: OAuthCallbackParams,
) -> Response {
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(removal_cookie(&state.web));

    let Ok(kind) = provider.parse::<ProviderKind>() else {
        return (jar, failure_redirect(&state.web, "invalid request")).into_response();
    };

    let state_matches = matches!(
        (&expected_state, &params.state),
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received
    );
    if !state_matches {
        warn!(provider = %kind, "OAuth callback with missing or mismatched state");
        return (jar, failure_redirect(&state.web, "invalid state")).into_response();
    }

    if let Some(error) = params.error {
        info!(provider = %kind, %error, "Provider reported an authorization error");
        return (jar, failure_redirect(&state.web, "access denied")).into_response();
    }

    let command = FinishOAuthCommand {
        provider: kind,
        code: params.code.unwrap_or_default(),
        user_data: params.user,
    };

    match state.oauth_service.finish(command).await {
        Ok(session) => (jar, success_redirect(&state.web, &session)).into_response(),
        Err(e) => {
            warn!(provider = %kind, error = %e, "Failed to finish OAuth flow");
            (jar, failure_redirect(&state.web, "unknown error")).into_response()
        }
    }
}

/// Exchanges a refresh token for a new pair.
///
/// # Endpoint
///
/// `POST /api/auth/refresh`
///
/// ```json
/// { "refresh_token": "..." }
/// ```
///
/// # Errors
///
/// Returns 400 for an empty token and 401 if it is unknown, rotated, revoked
/// or expired.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if payload.refresh_token.is_empty() {
        return Err(AppError::bad_request(
            "refresh token is required",
            json!({ "field": "refresh_token" }),
        ));
    }

    let session = state
        .session_service
        .refresh(&payload.refresh_token)
        .await
        .map_err(as_unauthorized)?;

    Ok(Json(session.into()))
}

/// Revokes the pair used to authenticate this request.
///
/// # Endpoint
///
/// `POST /api/auth/logout`
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(CurrentToken(token)): Extension<CurrentToken>,
) -> Result<StatusCode, AppError> {
    state
        .session_service
        .revoke(&token)
        .await
        .map_err(as_unauthorized)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the authenticated user's profile.
///
/// # Endpoint
///
/// `GET /api/auth/me`
pub async fn me_handler(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(user.into())
}

fn parse_provider(raw: &str) -> Result<ProviderKind, AppError> {
    raw.parse::<ProviderKind>().map_err(|e| {
        AppError::bad_request("Unsupported provider", json!({ "provider": e.to_string() }))
    })
}

fn state_cookie(web: &WebSettings, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(web.secure_cookies)
        // Apple posts the callback cross-site.
        .same_site(if web.secure_cookies {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .max_age(STATE_COOKIE_MAX_AGE);

    if let Some(domain) = &web.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }

    cookie.build()
}

fn removal_cookie(web: &WebSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build(STATE_COOKIE).path("/");

    if let Some(domain) = &web.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }

    cookie.build()
}

fn success_redirect(web: &WebSettings, session: &AuthSession) -> Response {
    let fragment = form_urlencoded::Serializer::new(String::new())
        .append_pair("access_token", &session.token.access_token)
        .append_pair("refresh_token", &session.token.refresh_token)
        .append_pair(
            "access_token_expiry_ms",
            &session.token.access_expires_at.timestamp_millis().to_string(),
        )
        .finish();

    found(&format!("{}#{}", web.auth_success_url, fragment))
}

fn failure_redirect(web: &WebSettings, reason: &str) -> Response {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("error", reason)
        .finish();

    found(&format!("{}?{}", web.auth_failure_url, query))
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
