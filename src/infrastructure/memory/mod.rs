//! In-process repository implementations.
//!
//! Selected with `STORAGE_BACKEND=memory` for local runs without PostgreSQL, and
//! used by the HTTP integration tests. Data lives for the life of the process.
//! Each store keeps its table behind a single `parking_lot::Mutex`; no lock is
//! ever held across an `.await`.

mod link_store;
mod token_store;
mod user_store;

pub use link_store::MemoryLinkRepository;
pub use token_store::MemoryTokenRepository;
pub use user_store::{ANONYMOUS_OWNER_ID, MemoryUserRepository};
