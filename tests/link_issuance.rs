mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use common::TestApp;
use link_shortener::application::services::CreateLinkCommand;
use link_shortener::domain::entities::ExpiryPolicy;
use link_shortener::domain::link_sweeper::run_link_sweeper;
use link_shortener::AppError;

fn command(owner_id: i64, url: &str) -> CreateLinkCommand {
    CreateLinkCommand {
        owner_id,
        url: url.to_string(),
        expiry: ExpiryPolicy::ThreeMonths,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_share_one_hash() {
    let app = TestApp::new();
    let service = app.state.link_service.clone();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .create_link(command(7, "https://example.com/race"))
                    .await
            })
        })
        .collect();

    let mut hashes = HashSet::new();
    let mut created = 0;
    for handle in handles {
        let short = handle.await.unwrap().unwrap();
        if short.created {
            created += 1;
        }
        hashes.insert(short.hash);
    }

    assert_eq!(hashes.len(), 1);
    assert_eq!(created, 1);
    assert_eq!(app.links.row_count(), 1);
}

#[tokio::test]
async fn test_equivalent_urls_deduplicate() {
    let app = TestApp::new();
    let service = &app.state.link_service;

    let first = service
        .create_link(command(7, "https://Example.com:443/a/?y=2&x=1#top"))
        .await
        .unwrap();
    let second = service
        .create_link(command(7, "https://example.com/a?x=1&y=2"))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.hash, second.hash);
    assert_eq!(second.link.redirect_url, "https://example.com/a?x=1&y=2");
}

#[tokio::test]
async fn test_existing_link_keeps_original_expiry() {
    let app = TestApp::new();
    let service = &app.state.link_service;

    let first = service
        .create_link(command(7, "https://example.com"))
        .await
        .unwrap();
    let second = service
        .create_link(CreateLinkCommand {
            expiry: ExpiryPolicy::Never,
            ..command(7, "https://example.com")
        })
        .await
        .unwrap();

    assert_eq!(second.link.expiry_policy, ExpiryPolicy::ThreeMonths);
    assert_eq!(second.link.expires_at, first.link.expires_at);
}

#[tokio::test]
async fn test_expired_duplicate_is_replaced() {
    let app = TestApp::new();
    let service = &app.state.link_service;

    let first = service
        .create_link(command(7, "https://example.com"))
        .await
        .unwrap();
    app.links.backdate_expiry(first.link.id, TimeDelta::days(400));

    let second = service
        .create_link(command(7, "https://example.com"))
        .await
        .unwrap();

    assert!(second.created);
    assert_ne!(first.hash, second.hash);
    assert!(second.link.expires_at.unwrap() > Utc::now());
}

#[tokio::test]
async fn test_hash_round_trips_through_codec() {
    let app = TestApp::new();
    let service = &app.state.link_service;

    let short = service
        .create_link(command(7, "https://example.com"))
        .await
        .unwrap();

    assert!(short.hash.len() >= 6);
    assert!(short.hash.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(service.decode_hash(&short.hash).unwrap(), short.link.id);
    assert_eq!(service.resolve(&short.hash).await.unwrap().id, short.link.id);
}

#[tokio::test]
async fn test_resolve_rejects_garbage() {
    let app = TestApp::new();

    for hash in ["", "!!", "Zx9Qk2Zx9Qk2"] {
        assert!(matches!(
            app.state.link_service.resolve(hash).await,
            Err(AppError::NotFound { .. })
        ));
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_retires_expired_links() {
    let app = TestApp::new();
    let service = &app.state.link_service;

    let stale = service
        .create_link(command(7, "https://example.com/stale"))
        .await
        .unwrap();
    let fresh = service
        .create_link(command(7, "https://example.com/fresh"))
        .await
        .unwrap();
    app.links.backdate_expiry(stale.link.id, TimeDelta::days(400));

    let sweeper = tokio::spawn(run_link_sweeper(
        app.links.clone(),
        std::time::Duration::from_secs(60),
    ));
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    sweeper.abort();

    let (links, total) = service.list_links(7, 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(links[0].hash, fresh.hash);
    assert_eq!(service.purge_expired().await.unwrap(), 0);
}
