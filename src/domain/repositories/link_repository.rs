//! Repository trait for link data access.

use crate::domain::entities::{ExpiryPolicy, Link, LinkInsert, LinkPage, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for managing links.
///
/// Every read filters out soft-deleted rows. Reads used for resolution and
/// listing additionally filter out expired rows.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_link.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a link unless the owner already has an active one for the same URL.
    ///
    /// The insert and the fallback read run as one atomic unit. An active but
    /// already expired row for the same key is retired first, so it never
    /// shadows a fresh insert.
    ///
    /// # Returns
    ///
    /// - [`LinkInsert::Created`] when a new row was written
    /// - [`LinkInsert::Existing`] when a matching active row won
    /// - [`LinkInsert::Vanished`] when neither write nor read produced a row
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors, including a
    /// serialization failure that persisted through retries.
    async fn create_or_fetch(&self, new_link: NewLink) -> Result<LinkInsert, AppError>;

    /// Finds a resolvable link (active and unexpired) by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Lists an owner's resolvable links, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_by_owner(&self, user_id: i64, limit: i64, offset: i64)
    -> Result<LinkPage, AppError>;

    /// Replaces the expiry of an owner's active link.
    ///
    /// Returns `Ok(None)` if no active link with that id belongs to the owner.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn update_expiry(
        &self,
        id: i64,
        user_id: i64,
        policy: ExpiryPolicy,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError>;

    /// Soft-deletes an owner's link.
    ///
    /// Returns `Ok(true)` if an active row was deleted, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete(&self, id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Soft-deletes every active link whose expiry has passed.
    ///
    /// Returns the number of rows retired.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn purge_expired(&self) -> Result<u64, AppError>;

    /// Returns true if the backing store answers.
    async fn health_check(&self) -> bool;
}
