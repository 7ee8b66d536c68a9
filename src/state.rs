//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{CaptchaGate, LinkService, OAuthService, SessionService};
use crate::infrastructure::cache::RedirectCache;

/// Settings the HTTP layer needs beyond the services themselves.
#[derive(Debug, Clone)]
pub struct WebSettings {
    /// Upper bound for cached redirect targets.
    pub cache_ttl: Duration,
    /// Owner of links created without a session.
    pub anonymous_user_id: i64,
    /// Landing page after a successful sign-in. Receives the pair in its fragment.
    pub auth_success_url: String,
    /// Landing page after a failed sign-in. Receives `?error=`.
    pub auth_failure_url: String,
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            anonymous_user_id: 1,
            auth_success_url: "/app/auth/success".to_string(),
            auth_failure_url: "/app/auth/fail".to_string(),
            cookie_domain: None,
            secure_cookies: true,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub session_service: Arc<SessionService>,
    pub oauth_service: Arc<OAuthService>,
    /// `None` disables anonymous link creation.
    pub captcha_gate: Option<Arc<CaptchaGate>>,
    pub cache: Arc<dyn RedirectCache>,
    pub web: Arc<WebSettings>,
}

impl AppState {
    pub fn new(
        link_service: Arc<LinkService>,
        session_service: Arc<SessionService>,
        oauth_service: Arc<OAuthService>,
        captcha_gate: Option<Arc<CaptchaGate>>,
        cache: Arc<dyn RedirectCache>,
        web: WebSettings,
    ) -> Self {
        Self {
            link_service,
            session_service,
            oauth_service,
            captcha_gate,
            cache,
            web: Arc::new(web),
        }
    }
}
