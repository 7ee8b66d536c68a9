//! Identity provider port.
//!
//! Each provider hides its own protocol (authorization URL shape, token
//! exchange, profile lookup) behind the same two operations. Adding a provider
//! means adding a [`ProviderKind`] variant and one implementation.

use async_trait::async_trait;

use crate::domain::entities::{ProfileUpdate, ProviderKind};
use crate::error::AppError;

/// Normalized claims about the person who completed an authorization flow.
///
/// Fields the provider does not supply are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    pub provider: ProviderKind,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

impl IdentityAssertion {
    pub fn new(provider: ProviderKind, external_id: impl Into<String>) -> Self {
        Self {
            provider,
            external_id: external_id.into(),
            email: String::new(),
            name: String::new(),
            avatar_url: String::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = avatar_url.into();
        self
    }

    pub fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Builds the URL the user agent is sent to, carrying `state` verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the provider is misconfigured.
    fn authorization_url(&self, state: &str) -> Result<String, AppError>;

    /// Redeems an authorization code for the identity behind it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] on network failure, a rejected code or an
    /// unparseable provider response.
    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError>;
}
