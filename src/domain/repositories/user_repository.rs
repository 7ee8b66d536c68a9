//! Repository trait for user data access.

use crate::domain::entities::{NewUser, ProfileUpdate, ProviderKind, User};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for reconciled users.
///
/// At most one active user exists per `(provider, provider_user_id)`.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUserRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryUserRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if an active user already exists for the
    /// same provider identity.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Finds an active user by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Finds the active user for a provider identity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_provider(
        &self,
        provider: ProviderKind,
        provider_user_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Overwrites the profile fields of an active user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the user is gone.
    /// Returns [`AppError::Internal`] on database errors.
    async fn update_profile(&self, id: i64, profile: ProfileUpdate) -> Result<User, AppError>;

    /// Marks a user deleted, freeing their provider identity for a new user.
    ///
    /// Returns `false` if no active user had the id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;
}
