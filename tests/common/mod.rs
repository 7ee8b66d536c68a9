#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use link_shortener::application::services::{
    CaptchaGate, CaptchaPolicy, IdentityService, LinkService, OAuthService, ProviderRegistry,
    SessionPolicy, SessionService,
};
use link_shortener::domain::captcha::{CaptchaVerdict, CaptchaVerifier};
use link_shortener::domain::entities::{NewUser, ProviderKind, Token, User};
use link_shortener::domain::identity::{IdentityAssertion, IdentityProvider};
use link_shortener::domain::repositories::UserRepository;
use link_shortener::error::AppError;
use link_shortener::infrastructure::cache::{NullCache, RedirectCache};
use link_shortener::infrastructure::codec::SqidsCodec;
use link_shortener::infrastructure::memory::{
    MemoryLinkRepository, MemoryTokenRepository, MemoryUserRepository,
};
use link_shortener::infrastructure::oauth::AnonymousProvider;
use link_shortener::routes::build_router;
use link_shortener::state::{AppState, WebSettings};
use parking_lot::Mutex;
use serde_json::json;

pub const BASE_URL: &str = "https://sho.rt";
pub const CAPTCHA_HEADER: &str = "x-recaptcha-token";

/// Captcha service that answers every token with the same verdict.
pub struct ScriptedCaptcha(pub CaptchaVerdict);

impl ScriptedCaptcha {
    pub fn human() -> Self {
        Self(CaptchaVerdict {
            success: true,
            score: 0.9,
            action: "create_link".to_string(),
        })
    }

    pub fn bot() -> Self {
        Self(CaptchaVerdict {
            success: true,
            score: 0.1,
            action: "create_link".to_string(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for ScriptedCaptcha {
    async fn verify(&self, _response_token: &str) -> Result<CaptchaVerdict, AppError> {
        Ok(self.0.clone())
    }
}

/// External provider that accepts the single code `good-code`.
pub struct ScriptedProvider {
    pub assertion: IdentityAssertion,
}

impl ScriptedProvider {
    pub fn google(sub: &str, name: &str) -> Self {
        Self {
            assertion: IdentityAssertion::new(ProviderKind::Google, sub)
                .with_email(format!("{sub}@example.com"))
                .with_name(name),
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.assertion.provider
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        Ok(format!("https://idp.example/authorize?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError> {
        if code == "good-code" {
            Ok(self.assertion.clone())
        } else {
            Err(AppError::upstream(
                "idp rejected the authorization code",
                json!({}),
            ))
        }
    }
}

/// In-process cache that records what was stored, for cache-aside assertions.
#[derive(Default)]
pub struct RecordingCache {
    pub entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl RedirectCache for RecordingCache {
    async fn get_target(&self, hash: &str) -> Option<String> {
        self.entries.lock().get(hash).cloned()
    }

    async fn put_target(&self, hash: &str, target: &str, _ttl: Duration) {
        self.entries
            .lock()
            .insert(hash.to_string(), target.to_string());
    }

    async fn invalidate(&self, hash: &str) {
        self.entries.lock().remove(hash);
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// A fully wired service on memory stores.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub links: Arc<MemoryLinkRepository>,
    pub users: Arc<MemoryUserRepository>,
    pub tokens: Arc<MemoryTokenRepository>,
}

pub struct TestAppBuilder {
    captcha: Option<ScriptedCaptcha>,
    cache: Arc<dyn RedirectCache>,
    providers: Vec<Arc<dyn IdentityProvider>>,
    policy: SessionPolicy,
}

impl TestAppBuilder {
    pub fn captcha(mut self, captcha: ScriptedCaptcha) -> Self {
        self.captcha = Some(captcha);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn RedirectCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider(mut self, provider: ScriptedProvider) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn session_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestApp {
        let links = Arc::new(MemoryLinkRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let tokens = Arc::new(MemoryTokenRepository::new());

        let link_service = Arc::new(LinkService::new(
            links.clone(),
            Arc::new(SqidsCodec::new(6).unwrap()),
            BASE_URL,
        ));
        let session_service = Arc::new(SessionService::new(
            tokens.clone(),
            users.clone(),
            self.policy,
        ));

        let mut registry = ProviderRegistry::new().with(Arc::new(AnonymousProvider::new(
            format!("{BASE_URL}/api/auth/anonymous/callback"),
        )));
        for provider in self.providers {
            registry.register(provider);
        }

        let oauth_service = Arc::new(OAuthService::new(
            registry,
            Arc::new(IdentityService::new(users.clone())),
            session_service.clone(),
        ));

        let captcha_gate = self.captcha.map(|captcha| {
            Arc::new(CaptchaGate::new(Arc::new(captcha), CaptchaPolicy::default()))
        });

        let state = AppState::new(
            link_service,
            session_service,
            oauth_service,
            captcha_gate,
            self.cache,
            WebSettings {
                secure_cookies: false,
                ..WebSettings::default()
            },
        );

        let server = TestServer::new(build_router(state.clone())).unwrap();

        TestApp {
            server,
            state,
            links,
            users,
            tokens,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            captcha: None,
            cache: Arc::new(NullCache::new()),
            providers: Vec::new(),
            policy: SessionPolicy::default(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a GitHub user and issues a session for them.
    pub async fn sign_in(&self, login: &str) -> (User, Token) {
        let user = self
            .users
            .create(NewUser {
                provider: ProviderKind::Github,
                provider_user_id: format!("gh-{login}"),
                email: format!("{login}@example.com"),
                name: login.to_string(),
                avatar_url: String::new(),
            })
            .await
            .unwrap();

        let token = self.state.session_service.issue(user.id).await.unwrap();

        (user, token)
    }
}

pub fn bearer(token: &Token) -> String {
    format!("Bearer {}", token.access_token)
}
