//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, cache setup, provider registration, the link
//! sweeper, and the Axum server lifecycle.

use crate::application::services::{
    CaptchaGate, CaptchaPolicy, IdentityService, LinkService, OAuthService, ProviderRegistry,
    SessionPolicy, SessionService,
};
use crate::config::{Config, StorageBackend};
use crate::domain::link_sweeper::run_link_sweeper;
use crate::domain::repositories::{LinkRepository, TokenRepository, UserRepository};
use crate::infrastructure::cache::{NullCache, RedirectCache, RedisCache};
use crate::infrastructure::captcha::RecaptchaVerifier;
use crate::infrastructure::codec::SqidsCodec;
use crate::infrastructure::http::build_client;
use crate::infrastructure::memory::{
    MemoryLinkRepository, MemoryTokenRepository, MemoryUserRepository,
};
use crate::infrastructure::oauth::{
    AnonymousProvider, AppleProvider, GithubProvider, GoogleProvider,
};
use crate::infrastructure::persistence::{PgLinkRepository, PgTokenRepository, PgUserRepository};
use crate::routes::app_router;
use crate::state::{AppState, WebSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use chrono::TimeDelta;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// The three stores behind the services.
pub struct Repositories {
    pub links: Arc<dyn LinkRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
}

/// Opens the configured storage backend, applying migrations for PostgreSQL.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn open_repositories(config: &Config) -> Result<Repositories> {
    match (config.storage_backend, &config.database_url) {
        (StorageBackend::Postgres, Some(database_url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .idle_timeout(Duration::from_secs(config.db_idle_timeout))
                .max_lifetime(Duration::from_secs(config.db_max_lifetime))
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to apply migrations")?;

            let pool = Arc::new(pool);
            Ok(Repositories {
                links: Arc::new(PgLinkRepository::new(pool.clone())),
                users: Arc::new(PgUserRepository::new(pool.clone())),
                tokens: Arc::new(PgTokenRepository::new(pool)),
            })
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("DATABASE_URL is required for the postgres storage backend")
        }
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Repositories {
                links: Arc::new(MemoryLinkRepository::new()),
                users: Arc::new(MemoryUserRepository::new()),
                tokens: Arc::new(MemoryTokenRepository::new()),
            })
        }
    }
}

/// Registers the anonymous provider plus every configured external one.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the Apple key is invalid.
pub fn build_providers(config: &Config) -> Result<ProviderRegistry> {
    let client = build_client()?;

    let mut registry = ProviderRegistry::new().with(Arc::new(AnonymousProvider::new(format!(
        "{}/api/auth/anonymous/callback",
        config.base_url
    ))));

    if let Some(google) = &config.google {
        registry.register(Arc::new(GoogleProvider::new(client.clone(), google.clone())));
    }
    if let Some(github) = &config.github {
        registry.register(Arc::new(GithubProvider::new(client.clone(), github.clone())));
    }
    if let Some(apple) = &config.apple {
        registry.register(Arc::new(
            AppleProvider::new(client, apple.clone()).context("Failed to set up Apple sign-in")?,
        ));
    }

    Ok(registry)
}

async fn connect_cache(config: &Config) -> Arc<dyn RedirectCache> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

/// Wires services and state from configuration and opened stores.
///
/// # Errors
///
/// Returns an error if the codec, HTTP client or a provider cannot be built.
pub fn build_state(
    config: &Config,
    repositories: &Repositories,
    cache: Arc<dyn RedirectCache>,
) -> Result<AppState> {
    let codec = SqidsCodec::new(config.hash_min_length).context("Failed to build hash codec")?;
    let link_service = Arc::new(LinkService::new(
        repositories.links.clone(),
        Arc::new(codec),
        config.base_url.clone(),
    ));

    let session_service = Arc::new(SessionService::new(
        repositories.tokens.clone(),
        repositories.users.clone(),
        SessionPolicy {
            access_ttl: TimeDelta::seconds(config.access_token_ttl_seconds),
            refresh_ttl: TimeDelta::seconds(config.refresh_token_ttl_seconds),
        },
    ));

    let oauth_service = Arc::new(OAuthService::new(
        build_providers(config)?,
        Arc::new(IdentityService::new(repositories.users.clone())),
        session_service.clone(),
    ));

    let captcha_gate = match &config.recaptcha_secret {
        Some(secret) => Some(Arc::new(CaptchaGate::new(
            Arc::new(RecaptchaVerifier::new(build_client()?, secret.clone())),
            CaptchaPolicy {
                allowed_actions: config.recaptcha_actions.clone(),
                threshold: config.recaptcha_threshold,
            },
        ))),
        None => None,
    };

    Ok(AppState::new(
        link_service,
        session_service,
        oauth_service,
        captcha_gate,
        cache,
        WebSettings {
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            anonymous_user_id: config.anonymous_user_id,
            auth_success_url: config.auth_success_url.clone(),
            auth_failure_url: config.auth_failure_url.clone(),
            cookie_domain: config.cookie_domain.clone(),
            secure_cookies: config.secure_cookies,
        },
    ))
}

/// Runs the HTTP server with the given configuration until a shutdown signal.
///
/// # Errors
///
/// Returns an error if storage setup fails, the listen address is invalid or
/// cannot be bound, or the server stops with an error.
pub async fn run(config: Config) -> Result<()> {
    let repositories = open_repositories(&config).await?;
    let cache = connect_cache(&config).await;
    let state = build_state(&config, &repositories, cache)?;

    let sweeper = tokio::spawn(run_link_sweeper(
        repositories.links.clone(),
        Duration::from_secs(config.link_sweep_interval_seconds),
    ));
    tracing::info!("Link sweeper started");

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
