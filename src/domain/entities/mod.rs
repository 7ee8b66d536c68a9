//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A redirect mapping owned by a user
//! - [`User`] - An identity reconciled from an external provider
//! - [`Token`] - A bearer credential pair (access + refresh)
//!
//! # Design Pattern
//!
//! Entities follow the "New Type" pattern with separate structs for creation:
//! - `NewLink`, `NewUser`, `NewToken` - For creating new records
//! - `ProfileUpdate` - For partial user updates
//!
//! Rows are never hard-deleted. Soft deletion is carried as an explicit
//! [`RecordState`] instead of a bare flag, and storage maps it to a boolean column.

pub mod link;
pub mod token;
pub mod user;

pub use link::{ExpiryPolicy, Link, LinkInsert, LinkPage, NewLink};
pub use token::{NewToken, Token};
pub use user::{NewUser, ProfileUpdate, ProviderKind, User};

/// Lifecycle state shared by every persisted entity.
///
/// Deleted rows are excluded from every lookup. For tokens, deletion covers
/// both rotation (superseded on refresh) and revocation (logout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    #[default]
    Active,
    Deleted,
}

impl RecordState {
    /// Maps the storage `deleted` column to a lifecycle state.
    pub fn from_deleted_flag(deleted: bool) -> Self {
        if deleted { Self::Deleted } else { Self::Active }
    }

    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}
