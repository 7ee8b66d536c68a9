mod common;

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use common::TestApp;
use link_shortener::AppError;
use link_shortener::application::services::SessionPolicy;
use link_shortener::domain::repositories::UserRepository;

#[tokio::test]
async fn test_issue_and_authenticate() {
    let app = TestApp::new();
    let (user, token) = app.sign_in("octo").await;

    let now = Utc::now();
    assert!(token.access_expires_at > now);
    assert!(token.refresh_expires_at > token.access_expires_at);
    assert_ne!(token.access_token, token.refresh_token);

    let authenticated = app
        .state
        .session_service
        .authenticate(&token.access_token)
        .await
        .unwrap();
    assert_eq!(authenticated.id, user.id);
}

#[tokio::test]
async fn test_policy_lifetimes_are_applied() {
    let app = TestApp::builder()
        .session_policy(SessionPolicy {
            access_ttl: TimeDelta::minutes(5),
            refresh_ttl: TimeDelta::days(1),
        })
        .build();
    let (_, token) = app.sign_in("octo").await;

    let access = token.access_expires_at - token.created_at;
    let refresh = token.refresh_expires_at - token.created_at;
    assert!((access - TimeDelta::minutes(5)).num_seconds().abs() <= 1);
    assert!((refresh - TimeDelta::days(1)).num_seconds().abs() <= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let app = TestApp::new();
    let (_, token) = app.sign_in("octo").await;
    let service = app.state.session_service.clone();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let refresh_token = token.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&refresh_token).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, AppError::NotFound { .. }), "{e:?}"),
        }
    }

    assert_eq!(winners, 1);
    // Only the winner's replacement survives.
    assert_eq!(app.tokens.active_count(), 1);
}

#[tokio::test]
async fn test_refresh_after_refresh_ttl_is_expired() {
    let app = TestApp::new();
    let (_, token) = app.sign_in("octo").await;

    app.tokens.age(token.id, TimeDelta::days(31));

    let result = app.state.session_service.refresh(&token.refresh_token).await;

    assert!(matches!(result, Err(AppError::Expired { .. })));
    assert_eq!(app.tokens.active_count(), 1);
}

#[tokio::test]
async fn test_refresh_works_after_access_expiry() {
    let app = TestApp::new();
    let (user, token) = app.sign_in("octo").await;

    app.tokens.age(token.id, TimeDelta::hours(2));

    assert!(matches!(
        app.state.session_service.authenticate(&token.access_token).await,
        Err(AppError::Expired { .. })
    ));

    let session = app
        .state
        .session_service
        .refresh(&token.refresh_token)
        .await
        .unwrap();
    assert_eq!(session.user.id, user.id);
    assert!(session.token.access_expires_at > Utc::now());
}

#[tokio::test]
async fn test_revoke_all_signs_out_everywhere() {
    let app = TestApp::new();
    let (user, first) = app.sign_in("octo").await;
    let second = app.state.session_service.issue(user.id).await.unwrap();
    let (_, bystander) = app.sign_in("bystander").await;

    let revoked = app.state.session_service.revoke_all(user.id).await.unwrap();
    assert_eq!(revoked, 2);

    for token in [&first, &second] {
        assert!(matches!(
            app.state.session_service.authenticate(&token.access_token).await,
            Err(AppError::NotFound { .. })
        ));
    }
    assert!(app
        .state
        .session_service
        .authenticate(&bystander.access_token)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_revoke_twice_fails() {
    let app = TestApp::new();
    let (_, token) = app.sign_in("octo").await;

    app.state
        .session_service
        .revoke(&token.access_token)
        .await
        .unwrap();

    assert!(matches!(
        app.state.session_service.revoke(&token.access_token).await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_authenticate_rejects_deleted_user() {
    let app = TestApp::new();
    let (user, token) = app.sign_in("octo").await;

    assert!(app.users.soft_delete(user.id).await.unwrap());

    let result = app
        .state
        .session_service
        .authenticate(&token.access_token)
        .await;
    assert!(matches!(
        result,
        Err(AppError::NotFound { ref message, .. }) if message == "User not found"
    ));

    app.server
        .get("/api/auth/me")
        .add_header("Authorization", common::bearer(&token))
        .await
        .assert_status_unauthorized();
}
