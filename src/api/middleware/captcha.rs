//! Captcha gate for anonymous requests.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use super::auth::Viewer;
use crate::{error::AppError, state::AppState};

pub const CAPTCHA_HEADER: &str = "x-recaptcha-token";

/// Requires a passing captcha from callers without a session.
///
/// Must run inside [`super::auth::optional_layer`]; signed-in viewers skip the
/// check entirely.
///
/// # Errors
///
/// Returns `401 Unauthorized` when no captcha verifier is configured, since
/// anonymous creation is then unavailable. Returns `422` for any rejected or
/// missing token and `502` if the verification service fails.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let signed_in = req
        .extensions()
        .get::<Viewer>()
        .is_some_and(|viewer| viewer.0.is_some());
    if signed_in {
        return Ok(next.run(req).await);
    }

    let Some(gate) = st.captcha_gate.as_ref() else {
        return Err(AppError::unauthorized(
            "Sign in required",
            json!({ "reason": "anonymous link creation is disabled" }),
        ));
    };

    let response_token = req
        .headers()
        .get(CAPTCHA_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    gate.validate(response_token).await?;

    Ok(next.run(req).await)
}
