//! PostgreSQL implementation of user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{NewUser, ProfileUpdate, ProviderKind, RecordState, User};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

#[derive(FromRow)]
struct UserRow {
    id: i64,
    provider_type: i16,
    provider_user_id: String,
    email: String,
    name: String,
    avatar_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: bool,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let provider = ProviderKind::from_code(row.provider_type).ok_or_else(|| {
            AppError::internal(
                "Unknown provider type in storage",
                json!({ "provider_type": row.provider_type, "user_id": row.id }),
            )
        })?;

        Ok(User {
            id: row.id,
            provider,
            provider_user_id: row.provider_user_id,
            email: row.email,
            name: row.name,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            state: RecordState::from_deleted_flag(row.deleted),
        })
    }
}

/// PostgreSQL repository for reconciled users.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            INSERT INTO users (provider_type, provider_user_id, email, name, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider_type, provider_user_id) WHERE NOT deleted DO NOTHING
            RETURNING id, provider_type, provider_user_id, email, name, avatar_url,
                      created_at, updated_at, deleted
            "#,
        )
        .bind(new_user.provider.code())
        .bind(&new_user.provider_user_id)
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.avatar_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.ok_or_else(|| {
            AppError::conflict(
                "User already exists",
                json!({ "provider": new_user.provider.as_str() }),
            )
        })?
        .try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, provider_type, provider_user_id, email, name, avatar_url,
                   created_at, updated_at, deleted
            FROM users
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_provider(
        &self,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, provider_type, provider_user_id, email, name, avatar_url,
                   created_at, updated_at, deleted
            FROM users
            WHERE provider_type = $1
              AND provider_user_id = $2
              AND NOT deleted
            "#,
        )
        .bind(provider.code())
        .bind(provider_user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_profile(&self, id: i64, profile: ProfileUpdate) -> Result<User, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users
            SET email = $2, name = $3, avatar_url = $4, updated_at = NOW()
            WHERE id = $1 AND NOT deleted
            RETURNING id, provider_type, provider_user_id, email, name, avatar_url,
                      created_at, updated_at, deleted
            "#,
        )
        .bind(id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.avatar_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.ok_or_else(|| AppError::not_found("User not found", json!({ "user_id": id })))?
            .try_into()
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
