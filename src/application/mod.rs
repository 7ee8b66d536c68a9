//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and business rules. Services consume repository traits and provide
//! a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Idempotent link issuance and owner operations
//! - [`services::identity_service::IdentityService`] - Provider identity reconciliation
//! - [`services::session_service::SessionService`] - Access/refresh token lifecycle
//! - [`services::captcha_gate::CaptchaGate`] - Captcha verdict evaluation
//! - [`services::oauth_service::OAuthService`] - Provider-agnostic sign-in flow

pub mod services;
