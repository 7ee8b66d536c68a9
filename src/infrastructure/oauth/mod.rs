//! Identity provider adapters.
//!
//! # Providers
//!
//! - [`AnonymousProvider`] - Device-local identities with no external service
//! - [`GoogleProvider`] - OAuth 2.0 + userinfo endpoint
//! - [`GithubProvider`] - OAuth 2.0 + REST user/emails endpoints
//! - [`AppleProvider`] - Sign in with Apple, signed client secret and ID token claims

mod anonymous;
mod apple;
mod github;
mod google;

pub use anonymous::AnonymousProvider;
pub use apple::{AppleConfig, AppleProvider};
pub use github::GithubProvider;
pub use google::GoogleProvider;

use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::AppError;

/// Credentials of a classic OAuth 2.0 client registration.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Token endpoint response. Some providers answer 200 with an `error` field.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_access_token(self, service: &'static str) -> Result<String, AppError> {
        match (self.access_token, self.error) {
            (Some(token), None) if !token.is_empty() => Ok(token),
            (_, error) => Err(rejected(service, error, self.error_description)),
        }
    }

    fn into_id_token(self, service: &'static str) -> Result<String, AppError> {
        match (self.id_token, self.error) {
            (Some(token), None) if !token.is_empty() => Ok(token),
            (_, error) => Err(rejected(service, error, self.error_description)),
        }
    }
}

fn rejected(service: &'static str, error: Option<String>, description: Option<String>) -> AppError {
    AppError::upstream(
        format!("{service} rejected the authorization code"),
        json!({ "service": service, "error": error, "description": description }),
    )
}

/// Builds an authorization URL with properly encoded query parameters.
fn authorization_url(endpoint: &str, params: &[(&str, &str)]) -> Result<String, AppError> {
    Url::parse_with_params(endpoint, params)
        .map(String::from)
        .map_err(|e| {
            AppError::internal(
                "Invalid authorization endpoint",
                json!({ "endpoint": endpoint, "reason": e.to_string() }),
            )
        })
}
