//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::{sync::Arc, time::Duration};
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::warn;

use crate::domain::entities::{ExpiryPolicy, Link, LinkInsert, LinkPage, NewLink, RecordState};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::db_error::is_retryable_conflict;

/// Re-runs of an idempotent insert after a serialization failure.
const MAX_SERIALIZATION_RETRIES: usize = 4;

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    user_id: i64,
    redirect_url: String,
    expires_type: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted: bool,
}

impl TryFrom<LinkRow> for Link {
    type Error = sqlx::Error;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let expiry_policy = row
            .expires_type
            .parse::<ExpiryPolicy>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Link {
            id: row.id,
            user_id: row.user_id,
            redirect_url: row.redirect_url,
            expiry_policy,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            state: RecordState::from_deleted_flag(row.deleted),
        })
    }
}

/// PostgreSQL repository for link storage.
///
/// Deduplication relies on the partial unique index
/// `links_owner_url_key ON links (user_id, md5(redirect_url)) WHERE NOT deleted`.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// One serializable attempt: retire an expired duplicate, try the insert,
    /// fall back to reading the row that won.
    async fn create_or_fetch_once(&self, new_link: &NewLink) -> Result<LinkInsert, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE links
            SET deleted = TRUE, updated_at = NOW()
            WHERE user_id = $1
              AND md5(redirect_url) = md5($2)
              AND NOT deleted
              AND expires_at IS NOT NULL
              AND expires_at <= NOW()
            "#,
        )
        .bind(new_link.user_id)
        .bind(&new_link.redirect_url)
        .execute(&mut *tx)
        .await?;

        let inserted: Option<LinkRow> = sqlx::query_as(
            r#"
            INSERT INTO links (user_id, redirect_url, expires_type, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, md5(redirect_url)) WHERE NOT deleted DO NOTHING
            RETURNING id, user_id, redirect_url, expires_type, expires_at,
                      created_at, updated_at, deleted
            "#,
        )
        .bind(new_link.user_id)
        .bind(&new_link.redirect_url)
        .bind(new_link.expiry_policy.as_str())
        .bind(new_link.expires_at)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(row) => LinkInsert::Created(row.try_into()?),
            None => {
                let existing: Option<LinkRow> = sqlx::query_as(
                    r#"
                    SELECT id, user_id, redirect_url, expires_type, expires_at,
                           created_at, updated_at, deleted
                    FROM links
                    WHERE user_id = $1
                      AND md5(redirect_url) = md5($2)
                      AND NOT deleted
                    "#,
                )
                .bind(new_link.user_id)
                .bind(&new_link.redirect_url)
                .fetch_optional(&mut *tx)
                .await?;

                match existing {
                    Some(row) => LinkInsert::Existing(row.try_into()?),
                    None => LinkInsert::Vanished,
                }
            }
        };

        tx.commit().await?;

        Ok(outcome)
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create_or_fetch(&self, new_link: NewLink) -> Result<LinkInsert, AppError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_millis(250))
            .map(jitter)
            .take(MAX_SERIALIZATION_RETRIES);

        let outcome = RetryIf::spawn(
            strategy,
            || self.create_or_fetch_once(&new_link),
            |e: &sqlx::Error| {
                let retry = is_retryable_conflict(e);
                if retry {
                    warn!(
                        user_id = new_link.user_id,
                        "Serialization conflict on link insert, retrying"
                    );
                }
                retry
            },
        )
        .await?;

        Ok(outcome)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, redirect_url, expires_type, expires_at,
                   created_at, updated_at, deleted
            FROM links
            WHERE id = $1
              AND NOT deleted
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::try_from).transpose()?)
    }

    async fn list_by_owner(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<LinkPage, AppError> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, redirect_url, expires_type, expires_at,
                   created_at, updated_at, deleted
            FROM links
            WHERE user_id = $1
              AND NOT deleted
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM links
            WHERE user_id = $1
              AND NOT deleted
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let links = rows
            .into_iter()
            .map(Link::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LinkPage { links, total })
    }

    async fn update_expiry(
        &self,
        id: i64,
        user_id: i64,
        policy: ExpiryPolicy,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError> {
        let row: Option<LinkRow> = sqlx::query_as(
            r#"
            UPDATE links
            SET expires_type = $3, expires_at = $4, updated_at = NOW()
            WHERE id = $1
              AND user_id = $2
              AND NOT deleted
            RETURNING id, user_id, redirect_url, expires_type, expires_at,
                      created_at, updated_at, deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(policy.as_str())
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::try_from).transpose()?)
    }

    async fn soft_delete(&self, id: i64, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT deleted
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET deleted = TRUE, updated_at = NOW()
            WHERE NOT deleted
              AND expires_at IS NOT NULL
              AND expires_at <= NOW()
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
