//! HTTP middleware for request processing and protection.
//!
//! Provides authentication, captcha gating, rate limiting, and observability.

pub mod auth;
pub mod captcha;
pub mod rate_limit;
pub mod tracing;
