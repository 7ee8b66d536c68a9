//! PostgreSQL implementation of token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{NewToken, RecordState, Token};
use crate::domain::repositories::TokenRepository;
use crate::error::AppError;

#[derive(FromRow)]
struct TokenRow {
    id: i64,
    user_id: i64,
    access_token: String,
    refresh_token: String,
    access_token_expires_at: DateTime<Utc>,
    refresh_token_expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: bool,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Token {
            id: row.id,
            user_id: row.user_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            access_expires_at: row.access_token_expires_at,
            refresh_expires_at: row.refresh_token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            state: RecordState::from_deleted_flag(row.deleted),
        }
    }
}

/// PostgreSQL repository for session credential pairs.
///
/// Both secrets carry their own unique index; lookups go through them.
pub struct PgTokenRepository {
    pool: Arc<PgPool>,
}

impl PgTokenRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, new_token: NewToken) -> Result<Token, AppError> {
        let row: TokenRow = sqlx::query_as(
            r#"
            INSERT INTO tokens (user_id, access_token, refresh_token,
                                access_token_expires_at, refresh_token_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, access_token, refresh_token,
                      access_token_expires_at, refresh_token_expires_at,
                      created_at, updated_at, deleted
            "#,
        )
        .bind(new_token.user_id)
        .bind(&new_token.access_token)
        .bind(&new_token.refresh_token)
        .bind(new_token.access_expires_at)
        .bind(new_token.refresh_expires_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_access_token(&self, access_token: &str) -> Result<Option<Token>, AppError> {
        let row: Option<TokenRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, access_token, refresh_token,
                   access_token_expires_at, refresh_token_expires_at,
                   created_at, updated_at, deleted
            FROM tokens
            WHERE access_token = $1 AND NOT deleted
            "#,
        )
        .bind(access_token)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Token::from))
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Token>, AppError> {
        let row: Option<TokenRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, access_token, refresh_token,
                   access_token_expires_at, refresh_token_expires_at,
                   created_at, updated_at, deleted
            FROM tokens
            WHERE refresh_token = $1 AND NOT deleted
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Token::from))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_by_user(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET deleted = TRUE, updated_at = NOW()
            WHERE user_id = $1 AND NOT deleted
            "#,
        )
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
