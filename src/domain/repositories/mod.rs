//! Repository trait definitions for the domain layer.
//!
//! This module defines the repository interfaces (traits) that abstract data access
//! operations following the Repository pattern. These traits are implemented by
//! concrete repositories in the infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence` (PostgreSQL)
//!   and `crate::infrastructure::memory` (in-process)
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Idempotent link issuance and owner operations
//! - [`UserRepository`] - Reconciled provider identities
//! - [`TokenRepository`] - Access/refresh credential pairs
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod link_repository;
pub mod token_repository;
pub mod user_repository;

pub use link_repository::LinkRepository;
pub use token_repository::TokenRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use token_repository::MockTokenRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
