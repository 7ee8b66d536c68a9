//! API route configuration.

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::api::handlers::{
    create_link_handler, delete_link_handler, list_links_handler, logout_handler, me_handler,
    oauth_callback_form_handler, oauth_callback_handler, oauth_start_handler, providers_handler,
    refresh_handler, update_link_handler,
};
use crate::api::middleware::{auth, captcha};
use crate::state::AppState;

/// Link routes.
///
/// - `POST   /links`         - Create a link (Bearer optional, captcha when anonymous)
/// - `GET    /links`         - List own links (Bearer)
/// - `PATCH  /links/{hash}`  - Change expiry (Bearer)
/// - `DELETE /links/{hash}`  - Soft-delete (Bearer)
pub fn link_routes(state: AppState) -> Router<AppState> {
    let require_auth = middleware::from_fn_with_state(state.clone(), auth::layer);

    Router::new()
        .route(
            "/links",
            post(create_link_handler)
                .route_layer(middleware::from_fn_with_state(state.clone(), captcha::layer))
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::optional_layer))
                .merge(get(list_links_handler).route_layer(require_auth.clone())),
        )
        .route(
            "/links/{hash}",
            patch(update_link_handler)
                .delete(delete_link_handler)
                .route_layer(require_auth),
        )
}

/// Authentication routes.
///
/// - `GET       /auth/providers`           - Enabled providers
/// - `GET       /auth/{provider}`          - Start an authorization flow
/// - `GET|POST  /auth/{provider}/callback` - Provider callback
/// - `POST      /auth/refresh`             - Rotate a credential pair
/// - `POST      /auth/logout`              - Revoke the current pair (Bearer)
/// - `GET       /auth/me`                  - Current user (Bearer)
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let require_auth = middleware::from_fn_with_state(state, auth::layer);

    let protected = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        .route_layer(require_auth);

    Router::new()
        .route("/auth/providers", get(providers_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/{provider}", get(oauth_start_handler))
        .route(
            "/auth/{provider}/callback",
            get(oauth_callback_handler).post(oauth_callback_form_handler),
        )
        .merge(protected)
}
