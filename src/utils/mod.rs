//! Utility functions shared across layers.
//!
//! - [`url_normalizer`] - URL normalization and sanitization
//! - [`secret`] - Random token and state generation
//! - [`refresh_ahead`] - Single-slot cache that reissues before expiry
//! - [`db_error`] - SQLSTATE classification for retries

pub mod db_error;
pub mod refresh_ahead;
pub mod secret;
pub mod url_normalizer;
