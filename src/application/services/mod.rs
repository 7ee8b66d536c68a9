//! Business logic services for the application layer.

pub mod captcha_gate;
pub mod identity_service;
pub mod link_service;
pub mod oauth_service;
pub mod session_service;

pub use captcha_gate::{CaptchaGate, CaptchaPolicy};
pub use identity_service::IdentityService;
pub use link_service::{CreateLinkCommand, LinkService, ShortLink};
pub use oauth_service::{FinishOAuthCommand, OAuthService, ProviderRegistry};
pub use session_service::{AuthSession, SessionPolicy, SessionService};
