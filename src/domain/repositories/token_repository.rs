//! Repository trait for session tokens.

use crate::domain::entities::{NewToken, Token};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for access/refresh credential pairs.
///
/// Lookups only ever return active (not soft-deleted) pairs. Expiry is judged
/// by the caller so that "expired" and "unknown" stay distinguishable.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgTokenRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryTokenRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_token.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persists a generated pair.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if either secret collides with a stored one.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_token: NewToken) -> Result<Token, AppError>;

    /// Finds the active pair holding this access token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_access_token(&self, access_token: &str) -> Result<Option<Token>, AppError>;

    /// Finds the active pair holding this refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_refresh_token(&self, refresh_token: &str)
    -> Result<Option<Token>, AppError>;

    /// Soft-deletes one pair.
    ///
    /// Returns `Ok(true)` only for the caller that flipped it from active to
    /// deleted. A second caller racing on the same pair gets `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Soft-deletes every active pair of a user and returns how many were retired.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete_by_user(&self, user_id: i64) -> Result<u64, AppError>;
}
