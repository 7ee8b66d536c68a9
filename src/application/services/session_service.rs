//! Session token lifecycle: issue, authenticate, refresh, revoke.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::entities::{NewToken, Token, User};
use crate::domain::repositories::{TokenRepository, UserRepository};
use crate::error::AppError;

/// Lifetimes applied to every issued pair.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub access_ttl: TimeDelta,
    pub refresh_ttl: TimeDelta,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            access_ttl: TimeDelta::hours(1),
            refresh_ttl: TimeDelta::days(30),
        }
    }
}

/// A freshly issued pair and the user it belongs to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: Token,
    pub user: User,
}

/// Service managing bearer credential pairs.
///
/// Unknown and revoked credentials surface as [`AppError::NotFound`]; credentials
/// past their TTL surface as [`AppError::Expired`]. The transport decides whether
/// to tell those apart.
#[derive(Clone)]
pub struct SessionService {
    tokens: Arc<dyn TokenRepository>,
    users: Arc<dyn UserRepository>,
    policy: SessionPolicy,
}

impl SessionService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        users: Arc<dyn UserRepository>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            tokens,
            users,
            policy,
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Generates and persists a new pair for a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on RNG or storage failure.
    pub async fn issue(&self, user_id: i64) -> Result<Token, AppError> {
        let new_token = NewToken::generate(
            user_id,
            self.policy.access_ttl,
            self.policy.refresh_ttl,
            Utc::now(),
        )?;

        let token = self.tokens.create(new_token).await?;

        metrics::counter!("sessions_issued_total").increment(1);
        info!(user_id, token_id = token.id, "Session issued");

        Ok(token)
    }

    /// Resolves an access token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the token is unknown or revoked, or its
    /// user is gone.
    /// Returns [`AppError::Expired`] once the access TTL has passed.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AppError> {
        let token = self.active_access_token(access_token).await?;

        self.users
            .find_by_id(token.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({})))
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// The replacement is persisted before the old pair is revoked, so a failure
    /// in between leaves the old pair usable rather than none at all. If a
    /// concurrent refresh of the same pair won the revocation, the replacement
    /// minted here is withdrawn and the call fails. The rotation runs on its own
    /// task and completes even if the caller goes away.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the refresh token is unknown, already
    /// rotated or revoked, or its user is gone.
    /// Returns [`AppError::Expired`] once the refresh TTL has passed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        let service = self.clone();
        let refresh_token = refresh_token.to_string();

        tokio::spawn(async move { service.rotate(&refresh_token).await })
            .await
            .map_err(|e| {
                AppError::internal("Token rotation aborted", json!({ "reason": e.to_string() }))
            })?
    }

    async fn rotate(&self, refresh_token: &str) -> Result<AuthSession, AppError> {
        let old = self
            .tokens
            .find_by_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| AppError::not_found("Refresh token not found", json!({})))?;

        if !old.can_be_refreshed_at(Utc::now()) {
            return Err(AppError::expired(
                "Refresh token expired",
                json!({ "expired_at": old.refresh_expires_at }),
            ));
        }

        let user = self
            .users
            .find_by_id(old.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({})))?;

        let replacement = self.issue(user.id).await?;

        if !self.tokens.soft_delete(old.id).await? {
            warn!(token_id = old.id, "Refresh token rotated concurrently, withdrawing replacement");
            self.tokens.soft_delete(replacement.id).await?;
            return Err(AppError::not_found("Refresh token not found", json!({})));
        }

        metrics::counter!("sessions_refreshed_total").increment(1);
        info!(
            user_id = user.id,
            old_token_id = old.id,
            new_token_id = replacement.id,
            "Session refreshed"
        );

        Ok(AuthSession {
            token: replacement,
            user,
        })
    }

    /// Revokes the pair holding this access token (logout).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the token is unknown or already revoked.
    /// Returns [`AppError::Expired`] once the access TTL has passed.
    pub async fn revoke(&self, access_token: &str) -> Result<(), AppError> {
        let token = self.active_access_token(access_token).await?;

        if !self.tokens.soft_delete(token.id).await? {
            return Err(AppError::not_found("Access token not found", json!({})));
        }

        metrics::counter!("sessions_revoked_total").increment(1);
        info!(user_id = token.user_id, token_id = token.id, "Session revoked");

        Ok(())
    }

    /// Revokes every active pair of a user. Returns how many were revoked.
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64, AppError> {
        let revoked = self.tokens.soft_delete_by_user(user_id).await?;

        metrics::counter!("sessions_revoked_total").increment(revoked);
        info!(user_id, revoked, "All sessions revoked");

        Ok(revoked)
    }

    async fn active_access_token(&self, access_token: &str) -> Result<Token, AppError> {
        let token = self
            .tokens
            .find_by_access_token(access_token)
            .await?
            .ok_or_else(|| AppError::not_found("Access token not found", json!({})))?;

        if !token.can_be_authorized_at(Utc::now()) {
            return Err(AppError::expired(
                "Access token expired",
                json!({ "expired_at": token.access_expires_at }),
            ));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ProviderKind, RecordState};
    use crate::domain::repositories::{MockTokenRepository, MockUserRepository};
    use chrono::{DateTime, Duration};
    use mockall::predicate::*;

    fn user(id: i64) -> User {
        let now = Utc::now();
        User {
            id,
            provider: ProviderKind::Github,
            provider_user_id: "1".into(),
            email: String::new(),
            name: "Octo".into(),
            avatar_url: String::new(),
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        }
    }

    fn token(
        id: i64,
        user_id: i64,
        access_exp: DateTime<Utc>,
        refresh_exp: DateTime<Utc>,
    ) -> Token {
        let now = Utc::now();
        Token {
            id,
            user_id,
            access_token: format!("access-{id}"),
            refresh_token: format!("refresh-{id}"),
            access_expires_at: access_exp,
            refresh_expires_at: refresh_exp,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        }
    }

    fn persisted(new_token: NewToken, id: i64) -> Token {
        let now = Utc::now();
        Token {
            id,
            user_id: new_token.user_id,
            access_token: new_token.access_token,
            refresh_token: new_token.refresh_token,
            access_expires_at: new_token.access_expires_at,
            refresh_expires_at: new_token.refresh_expires_at,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        }
    }

    fn service(tokens: MockTokenRepository, users: MockUserRepository) -> SessionService {
        SessionService::new(Arc::new(tokens), Arc::new(users), SessionPolicy::default())
    }

    #[tokio::test]
    async fn test_issue_applies_policy() {
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_create()
            .withf(|t| {
                let access = t.access_expires_at - Utc::now();
                let refresh = t.refresh_expires_at - Utc::now();
                t.user_id == 3
                    && access > Duration::minutes(59)
                    && access <= Duration::hours(1)
                    && refresh > Duration::days(29)
                    && refresh <= Duration::days(30)
            })
            .returning(|t| Ok(persisted(t, 1)));

        let token = service(tokens, MockUserRepository::new())
            .issue(3)
            .await
            .unwrap();
        assert_eq!(token.user_id, 3);
    }

    #[tokio::test]
    async fn test_authenticate_expired_access() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_access_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now - Duration::seconds(1), now + Duration::days(1))))
        });
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();

        let result = service(tokens, users).authenticate("access-1").await;
        assert!(matches!(result, Err(AppError::Expired { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_unknown() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_access_token().returning(|_| Ok(None));

        let result = service(tokens, MockUserRepository::new())
            .authenticate("nope")
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_returns_user() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_access_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now + Duration::hours(1), now + Duration::days(1))))
        });
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().with(eq(3)).returning(|id| Ok(Some(user(id))));

        let user = service(tokens, users).authenticate("access-1").await.unwrap();
        assert_eq!(user.id, 3);
    }

    #[tokio::test]
    async fn test_refresh_creates_before_revoking() {
        let mut seq = mockall::Sequence::new();
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_find_by_refresh_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let now = Utc::now();
                Ok(Some(token(1, 3, now - Duration::hours(2), now + Duration::days(29))))
            });
        tokens
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|t| Ok(persisted(t, 2)));
        tokens
            .expect_soft_delete()
            .with(eq(1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));

        let session = service(tokens, users).refresh("refresh-1").await.unwrap();
        assert_eq!(session.token.id, 2);
        assert_eq!(session.user.id, 3);
    }

    #[tokio::test]
    async fn test_refresh_create_failure_keeps_old_pair() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_refresh_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now, now + Duration::days(29))))
        });
        tokens
            .expect_create()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        tokens.expect_soft_delete().never();

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));

        let result = service(tokens, users).refresh("refresh-1").await;
        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_refresh_lost_race_withdraws_replacement() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_refresh_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now, now + Duration::days(29))))
        });
        tokens.expect_create().returning(|t| Ok(persisted(t, 2)));
        tokens
            .expect_soft_delete()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(false));
        tokens
            .expect_soft_delete()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(true));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));

        let result = service(tokens, users).refresh("refresh-1").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_refresh_expired() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_refresh_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now - Duration::days(31), now - Duration::seconds(1))))
        });
        tokens.expect_create().never();

        let result = service(tokens, MockUserRepository::new())
            .refresh("refresh-1")
            .await;
        assert!(matches!(result, Err(AppError::Expired { .. })));
    }

    #[tokio::test]
    async fn test_revoke_twice_second_is_not_found() {
        let mut tokens = MockTokenRepository::new();
        tokens.expect_find_by_access_token().returning(|_| {
            let now = Utc::now();
            Ok(Some(token(1, 3, now + Duration::hours(1), now + Duration::days(1))))
        });
        let mut seq = mockall::Sequence::new();
        tokens
            .expect_soft_delete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        tokens
            .expect_soft_delete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));

        let service = service(tokens, MockUserRepository::new());
        assert!(service.revoke("access-1").await.is_ok());
        assert!(matches!(
            service.revoke("access-1").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_counts() {
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_soft_delete_by_user()
            .with(eq(3))
            .returning(|_| Ok(4));

        let revoked = service(tokens, MockUserRepository::new())
            .revoke_all(3)
            .await
            .unwrap();
        assert_eq!(revoked, 4);
    }
}
