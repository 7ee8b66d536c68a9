mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use chrono::TimeDelta;
use common::{RecordingCache, TestApp};
use link_shortener::application::services::{CreateLinkCommand, ShortLink};
use link_shortener::application::services::LinkService;
use link_shortener::domain::entities::ExpiryPolicy;
use link_shortener::infrastructure::cache::RedirectCache;
use parking_lot::Mutex;

async fn create(app: &TestApp, url: &str, expiry: ExpiryPolicy) -> ShortLink {
    app.state
        .link_service
        .create_link(CreateLinkCommand {
            owner_id: 1,
            url: url.to_string(),
            expiry,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_redirect_success() {
    let app = TestApp::new();
    let short = create(
        &app,
        "https://example.com/landing?b=2&a=1",
        ExpiryPolicy::ThreeMonths,
    )
    .await;

    let response = app.server.get(&format!("/{}", short.hash)).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://example.com/landing?a=1&b=2"
    );
}

#[tokio::test]
async fn test_redirect_unknown_hash() {
    let app = TestApp::new();

    app.server.get("/Zx9Qk2").await.assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_rejects_non_alphanumeric_hash() {
    let app = TestApp::new();

    app.server.get("/abc-def").await.assert_status_not_found();
    app.server.get("/abc_def").await.assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_expired_link() {
    let app = TestApp::new();
    let short = create(&app, "https://example.com", ExpiryPolicy::ThreeMonths).await;

    app.links.backdate_expiry(short.link.id, TimeDelta::days(400));

    app.server
        .get(&format!("/{}", short.hash))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_never_expiring_link() {
    let app = TestApp::new();
    let short = create(&app, "https://example.com/forever", ExpiryPolicy::Never).await;

    app.server
        .get(&format!("/{}", short.hash))
        .await
        .assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_redirect_populates_cache_on_miss() {
    let cache = Arc::new(RecordingCache::default());
    let app = TestApp::builder().cache(cache.clone()).build();
    let short = create(&app, "https://example.com/cached", ExpiryPolicy::SixMonths).await;

    app.server
        .get(&format!("/{}", short.hash))
        .await
        .assert_status(StatusCode::FOUND);

    let mut cached = None;
    for _ in 0..50 {
        cached = cache.entries.lock().get(&short.hash).cloned();
        if cached.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(cached.as_deref(), Some("https://example.com/cached"));
}

#[tokio::test]
async fn test_redirect_served_from_cache() {
    let cache = Arc::new(RecordingCache::default());
    cache
        .entries
        .lock()
        .insert("Cached1".to_string(), "https://example.com/from-cache".to_string());
    let app = TestApp::builder().cache(cache).build();

    let response = app.server.get("/Cached1").await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://example.com/from-cache"
    );
}

/// Cache whose first fill is preceded by the owner deleting the link, the way a
/// `DELETE` landing between resolve and fill would.
#[derive(Default)]
struct DeleteBeforeFill {
    inner: RecordingCache,
    links: Mutex<Option<Arc<LinkService>>>,
    deleted: Mutex<bool>,
}

#[async_trait]
impl RedirectCache for DeleteBeforeFill {
    async fn get_target(&self, hash: &str) -> Option<String> {
        self.inner.get_target(hash).await
    }

    async fn put_target(&self, hash: &str, target: &str, ttl: Duration) {
        let links = self.links.lock().take();
        let raced = links.is_some();
        if let Some(links) = links {
            links.delete_link(1, hash).await.unwrap();
            self.inner.invalidate(hash).await;
        }
        self.inner.put_target(hash, target, ttl).await;
        if raced {
            *self.deleted.lock() = true;
        }
    }

    async fn invalidate(&self, hash: &str) {
        self.inner.invalidate(hash).await;
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn test_delete_during_cache_fill_leaves_no_entry() {
    let cache = Arc::new(DeleteBeforeFill::default());
    let app = TestApp::builder().cache(cache.clone()).build();
    let short = create(&app, "https://example.com/racy", ExpiryPolicy::Never).await;
    *cache.links.lock() = Some(app.state.link_service.clone());

    app.server
        .get(&format!("/{}", short.hash))
        .await
        .assert_status(StatusCode::FOUND);

    let mut settled = false;
    for _ in 0..100 {
        if *cache.deleted.lock() && cache.inner.entries.lock().is_empty() {
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(settled, "deleted link stayed cached");

    app.server
        .get(&format!("/{}", short.hash))
        .await
        .assert_status_not_found();
}

