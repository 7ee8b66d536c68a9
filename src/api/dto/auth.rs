//! DTOs for authentication endpoints.

use serde::{Deserialize, Serialize};

use crate::application::services::AuthSession;
use crate::domain::entities::{ProviderKind, User};

/// Parameters a provider sends back to the callback, by query or form post.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set by the provider when the user denied access.
    #[serde(default)]
    pub error: Option<String>,
    /// One-time JSON profile payload (Apple only).
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub avatar_url: String,
    pub provider: ProviderKind,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            provider: user.provider,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expiry_ms: i64,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            access_token_expiry_ms: session.token.access_expires_at.timestamp_millis(),
            access_token: session.token.access_token,
            refresh_token: session.token.refresh_token,
        }
    }
}
