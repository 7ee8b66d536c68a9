//! Shared outbound HTTP plumbing for provider and captcha adapters.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::AppError;

/// Upper bound for any single outbound call.
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the client shared by all outbound adapters.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the TLS backend cannot be initialized.
pub fn build_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            AppError::internal("Failed to build HTTP client", json!({ "reason": e.to_string() }))
        })
}

/// Maps a transport failure to an upstream error tagged with the service name.
pub fn transport_error(service: &'static str, e: reqwest::Error) -> AppError {
    AppError::upstream(
        format!("{service} request failed"),
        json!({ "service": service, "reason": e.to_string() }),
    )
}

/// Reads a JSON body, treating any non-2xx status as an upstream failure.
///
/// # Errors
///
/// Returns [`AppError::Upstream`] with the status and body for rejected calls,
/// or the decode error for unparseable bodies.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, AppError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::upstream(
            format!("{service} rejected the request"),
            json!({ "service": service, "status": status.as_u16(), "body": body }),
        ));
    }

    response.json::<T>().await.map_err(|e| {
        AppError::upstream(
            format!("{service} returned an unreadable response"),
            json!({ "service": service, "reason": e.to_string() }),
        )
    })
}
