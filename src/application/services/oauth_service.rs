//! Provider-agnostic OAuth sign-in orchestration.

use std::{collections::HashMap, sync::Arc};

use serde_json::json;
use tracing::info;

use crate::application::services::identity_service::IdentityService;
use crate::application::services::session_service::{AuthSession, SessionService};
use crate::domain::entities::ProviderKind;
use crate::domain::identity::IdentityProvider;
use crate::error::AppError;

/// Enabled identity providers keyed by kind.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own kind, replacing any earlier one.
    pub fn register(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.register(provider);
        self
    }

    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the provider is not enabled.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn IdentityProvider>, AppError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            AppError::bad_request(
                "Identity provider is not enabled",
                json!({ "provider": kind.as_str() }),
            )
        })
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.code());
        kinds
    }
}

/// Callback parameters collected by the transport after the provider redirect.
#[derive(Debug, Clone)]
pub struct FinishOAuthCommand {
    pub provider: ProviderKind,
    pub code: String,
    /// Out-of-band user payload posted by some providers on first consent.
    pub user_data: Option<String>,
}

/// Drives authorization URL generation and the code-for-session exchange.
pub struct OAuthService {
    registry: ProviderRegistry,
    identity: Arc<IdentityService>,
    sessions: Arc<SessionService>,
}

impl OAuthService {
    pub fn new(
        registry: ProviderRegistry,
        identity: Arc<IdentityService>,
        sessions: Arc<SessionService>,
    ) -> Self {
        Self {
            registry,
            identity,
            sessions,
        }
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.registry.kinds()
    }

    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a disabled provider.
    pub fn authorization_url(
        &self,
        provider: ProviderKind,
        state: &str,
    ) -> Result<String, AppError> {
        self.registry.get(provider)?.authorization_url(state)
    }

    /// Redeems the code, reconciles the user and issues a session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a missing code or disabled provider.
    /// Returns [`AppError::Upstream`] if the provider rejects the code or answers
    /// for a different provider family.
    /// Returns [`AppError::Conflict`] if the user was created concurrently.
    pub async fn finish(&self, cmd: FinishOAuthCommand) -> Result<AuthSession, AppError> {
        if cmd.code.trim().is_empty() {
            return Err(AppError::bad_request(
                "Authorization code is required",
                json!({ "provider": cmd.provider.as_str() }),
            ));
        }

        let provider = self.registry.get(cmd.provider)?;
        let mut assertion = provider.exchange_code(&cmd.code).await?;

        if assertion.provider != cmd.provider {
            return Err(AppError::upstream(
                "Provider returned an identity for another provider",
                json!({ "expected": cmd.provider.as_str(), "actual": assertion.provider.as_str() }),
            ));
        }
        if assertion.external_id.is_empty() {
            return Err(AppError::upstream(
                "Provider returned an identity without a subject",
                json!({ "provider": cmd.provider.as_str() }),
            ));
        }

        IdentityService::merge_supplied_name(&mut assertion, cmd.user_data.as_deref());

        let user = self.identity.reconcile(assertion).await?;
        let token = self.sessions.issue(user.id).await?;

        info!(user_id = user.id, provider = %cmd.provider, "OAuth sign-in completed");

        Ok(AuthSession { token, user })
    }
}
