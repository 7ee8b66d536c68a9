//! Captcha gate for anonymous, unauthenticated actions.

use std::sync::Arc;

use tracing::debug;

use crate::domain::captcha::{CaptchaRejection, CaptchaVerdict, CaptchaVerifier};
use crate::error::AppError;

/// Acceptance rules applied to every verdict.
#[derive(Debug, Clone)]
pub struct CaptchaPolicy {
    pub allowed_actions: Vec<String>,
    pub threshold: f32,
}

impl Default for CaptchaPolicy {
    fn default() -> Self {
        Self {
            allowed_actions: vec!["create_link".to_string()],
            threshold: 0.5,
        }
    }
}

pub struct CaptchaGate {
    verifier: Arc<dyn CaptchaVerifier>,
    policy: CaptchaPolicy,
}

impl CaptchaGate {
    pub fn new(verifier: Arc<dyn CaptchaVerifier>, policy: CaptchaPolicy) -> Self {
        Self { verifier, policy }
    }

    /// Verifies a client-supplied response token.
    ///
    /// A missing token is rejected as unsuccessful without calling out.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CaptchaInvalid`] for any rejected verdict.
    /// Returns [`AppError::Upstream`] if the captcha service cannot be reached.
    pub async fn validate(&self, response_token: &str) -> Result<(), AppError> {
        let response_token = response_token.trim();
        if response_token.is_empty() {
            return Err(self.reject(CaptchaRejection::Unsuccessful));
        }

        let verdict = self.verifier.verify(response_token).await?;
        self.evaluate(&verdict).map_err(|reason| self.reject(reason))
    }

    /// Applies the policy to a verdict: success first, then action, then score.
    pub fn evaluate(&self, verdict: &CaptchaVerdict) -> Result<(), CaptchaRejection> {
        if !verdict.success {
            return Err(CaptchaRejection::Unsuccessful);
        }

        if !self.policy.allowed_actions.iter().any(|a| a == &verdict.action) {
            return Err(CaptchaRejection::ActionInvalid);
        }

        if verdict.score < self.policy.threshold {
            return Err(CaptchaRejection::NotHuman);
        }

        debug!(score = verdict.score, action = %verdict.action, "Captcha accepted");
        Ok(())
    }

    fn reject(&self, reason: CaptchaRejection) -> AppError {
        metrics::counter!("captcha_rejections_total", "reason" => reason.as_label()).increment(1);
        AppError::CaptchaInvalid { reason }
    }
}
