//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx runtime
//! queries mapped through `FromRow` row structs.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Idempotent link issuance and owner operations
//! - [`PgUserRepository`] - Reconciled users
//! - [`PgTokenRepository`] - Session credential pairs

pub mod pg_link_repository;
pub mod pg_token_repository;
pub mod pg_user_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_token_repository::PgTokenRepository;
pub use pg_user_repository::PgUserRepository;
