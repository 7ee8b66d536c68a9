use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;

use crate::domain::entities::{NewUser, ProfileUpdate, ProviderKind, RecordState, User};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

#[derive(Default)]
struct Users {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

/// Id and external id of the synthetic owner of anonymous links, matching the
/// row seeded by the initial migration.
pub const ANONYMOUS_OWNER_ID: i64 = 1;
const ANONYMOUS_OWNER_EXTERNAL_ID: &str = "anonymous_provider_id";

/// In-process user store.
///
/// Starts with the anonymous owner in place, so the first real user never
/// receives its id.
pub struct MemoryUserRepository {
    inner: Mutex<Users>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        let now = Utc::now();
        let owner = User {
            id: ANONYMOUS_OWNER_ID,
            provider: ProviderKind::Anonymous,
            provider_user_id: ANONYMOUS_OWNER_EXTERNAL_ID.to_string(),
            email: String::new(),
            name: "Anonymous".to_string(),
            avatar_url: String::new(),
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        };

        Self {
            inner: Mutex::new(Users {
                next_id: ANONYMOUS_OWNER_ID,
                rows: BTreeMap::from([(ANONYMOUS_OWNER_ID, owner)]),
            }),
        }
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.inner.lock();

        let taken = users.rows.values().any(|u| {
            !u.state.is_deleted()
                && u.provider == new_user.provider
                && u.provider_user_id == new_user.provider_user_id
        });
        if taken {
            return Err(AppError::conflict(
                "User already exists",
                json!({ "provider": new_user.provider.as_str() }),
            ));
        }

        let now = Utc::now();
        users.next_id += 1;
        let user = User {
            id: users.next_id,
            provider: new_user.provider,
            provider_user_id: new_user.provider_user_id,
            email: new_user.email,
            name: new_user.name,
            avatar_url: new_user.avatar_url,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        };
        users.rows.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .lock()
            .rows
            .get(&id)
            .filter(|u| !u.state.is_deleted())
            .cloned())
    }

    async fn find_by_provider(
        &self,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .inner
            .lock()
            .rows
            .values()
            .find(|u| {
                !u.state.is_deleted()
                    && u.provider == provider
                    && u.provider_user_id == provider_user_id
            })
            .cloned())
    }

    async fn update_profile(&self, id: i64, profile: ProfileUpdate) -> Result<User, AppError> {
        let mut users = self.inner.lock();

        let user = users
            .rows
            .get_mut(&id)
            .filter(|u| !u.state.is_deleted())
            .ok_or_else(|| AppError::not_found("User not found", json!({ "user_id": id })))?;

        user.email = profile.email;
        user.name = profile.name;
        user.avatar_url = profile.avatar_url;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let mut users = self.inner.lock();

        match users.rows.get_mut(&id).filter(|u| !u.state.is_deleted()) {
            Some(user) => {
                user.state = RecordState::Deleted;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
