use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use link_shortener::domain::entities::NewToken;
use link_shortener::domain::repositories::TokenRepository;
use link_shortener::error::AppError;
use link_shortener::infrastructure::persistence::PgTokenRepository;
use sqlx::PgPool;

fn new_token(user_id: i64) -> NewToken {
    NewToken::generate(user_id, TimeDelta::hours(1), TimeDelta::days(30), Utc::now()).unwrap()
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_find(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));
    let generated = new_token(1);

    let token = repo.create(generated.clone()).await.unwrap();
    assert_eq!(token.user_id, 1);

    let by_access = repo
        .find_by_access_token(&generated.access_token)
        .await
        .unwrap()
        .unwrap();
    let by_refresh = repo
        .find_by_refresh_token(&generated.refresh_token)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_access.id, token.id);
    assert_eq!(by_refresh.id, token.id);
    assert!(repo.find_by_access_token("unknown").await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_secret_conflicts(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));
    let generated = new_token(1);

    repo.create(generated.clone()).await.unwrap();
    let result = repo.create(generated).await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_soft_delete_has_single_winner(pool: PgPool) {
    let repo = Arc::new(PgTokenRepository::new(Arc::new(pool)));
    let token = repo.create(new_token(1)).await.unwrap();

    let (a, b) = tokio::join!(repo.soft_delete(token.id), repo.soft_delete(token.id));
    assert!(a.unwrap() ^ b.unwrap());

    assert!(
        repo.find_by_access_token(&token.access_token)
            .await
            .unwrap()
            .is_none()
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_soft_delete_by_user(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));
    repo.create(new_token(1)).await.unwrap();
    repo.create(new_token(1)).await.unwrap();

    assert_eq!(repo.soft_delete_by_user(1).await.unwrap(), 2);
    assert_eq!(repo.soft_delete_by_user(1).await.unwrap(), 0);
}
