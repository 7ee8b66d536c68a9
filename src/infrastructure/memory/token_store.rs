use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;

use crate::domain::entities::{NewToken, RecordState, Token};
use crate::domain::repositories::TokenRepository;
use crate::error::AppError;

#[derive(Default)]
struct Tokens {
    next_id: i64,
    rows: BTreeMap<i64, Token>,
    // every credential ever issued, revoked ones included
    by_access: HashMap<String, i64>,
    by_refresh: HashMap<String, i64>,
}

impl Tokens {
    fn active(&self, id: Option<&i64>) -> Option<Token> {
        id.and_then(|id| self.rows.get(id))
            .filter(|t| !t.state.is_deleted())
            .cloned()
    }
}

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenRepository {
    inner: Mutex<Tokens>,
}

impl MemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves both expiries of a stored pair into the past by `delta`.
    /// Test hook for expiry scenarios.
    pub fn age(&self, id: i64, delta: chrono::TimeDelta) {
        if let Some(token) = self.inner.lock().rows.get_mut(&id) {
            token.access_expires_at -= delta;
            token.refresh_expires_at -= delta;
        }
    }

    /// Number of pairs that are still active.
    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .rows
            .values()
            .filter(|t| !t.state.is_deleted())
            .count()
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn create(&self, new_token: NewToken) -> Result<Token, AppError> {
        let mut tokens = self.inner.lock();

        let collides = tokens.by_access.contains_key(&new_token.access_token)
            || tokens.by_refresh.contains_key(&new_token.refresh_token);
        if collides {
            return Err(AppError::conflict("Token already exists", json!({})));
        }

        let now = Utc::now();
        tokens.next_id += 1;
        let token = Token {
            id: tokens.next_id,
            user_id: new_token.user_id,
            access_token: new_token.access_token,
            refresh_token: new_token.refresh_token,
            access_expires_at: new_token.access_expires_at,
            refresh_expires_at: new_token.refresh_expires_at,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        };
        tokens.by_access.insert(token.access_token.clone(), token.id);
        tokens.by_refresh.insert(token.refresh_token.clone(), token.id);
        tokens.rows.insert(token.id, token.clone());

        Ok(token)
    }

    async fn find_by_access_token(&self, access_token: &str) -> Result<Option<Token>, AppError> {
        let tokens = self.inner.lock();
        Ok(tokens.active(tokens.by_access.get(access_token)))
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Token>, AppError> {
        let tokens = self.inner.lock();
        Ok(tokens.active(tokens.by_refresh.get(refresh_token)))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tokens = self.inner.lock();

        match tokens.rows.get_mut(&id).filter(|t| !t.state.is_deleted()) {
            Some(token) => {
                token.state = RecordState::Deleted;
                token.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_by_user(&self, user_id: i64) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut revoked = 0;

        for token in self.inner.lock().rows.values_mut() {
            if token.user_id == user_id && !token.state.is_deleted() {
                token.state = RecordState::Deleted;
                token.updated_at = now;
                revoked += 1;
            }
        }

        Ok(revoked)
    }
}
