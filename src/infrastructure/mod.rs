//! Infrastructure layer for external integrations.
//!
//! Concrete implementations of the ports defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Redirect cache (Redis and no-op implementations)
//! - [`captcha`] - reCAPTCHA verifier
//! - [`codec`] - Sqids identifier codec
//! - [`memory`] - In-process repositories
//! - [`oauth`] - Identity provider adapters
//! - [`persistence`] - PostgreSQL repositories

pub mod cache;
pub mod captcha;
pub mod codec;
pub mod http;
pub mod memory;
pub mod oauth;
pub mod persistence;
