//! Captcha verification port.

use async_trait::async_trait;

use crate::error::AppError;

/// Verdict returned by the captcha service for one response token.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaVerdict {
    pub success: bool,
    pub score: f32,
    pub action: String,
}

/// Why a verdict was rejected. Logged, never shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptchaRejection {
    #[error("unsuccessful")]
    Unsuccessful,
    #[error("action invalid")]
    ActionInvalid,
    #[error("not human")]
    NotHuman,
}

impl CaptchaRejection {
    /// Stable label for metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Unsuccessful => "unsuccessful",
            Self::ActionInvalid => "action_invalid",
            Self::NotHuman => "not_human",
        }
    }
}

/// Outbound call to a score-based captcha service.
///
/// # Errors
///
/// Implementations return [`AppError::Upstream`] when the service cannot be
/// reached or answers with something unparseable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, response_token: &str) -> Result<CaptchaVerdict, AppError>;
}
