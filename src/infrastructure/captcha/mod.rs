//! reCAPTCHA v3 site verification client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::captcha::{CaptchaVerdict, CaptchaVerifier};
use crate::error::AppError;
use crate::infrastructure::http::{read_json, transport_error};

pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

const SERVICE: &str = "recaptcha";

/// Site verification response. Score and action are absent on failures.
#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    action: String,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl From<SiteVerifyResponse> for CaptchaVerdict {
    fn from(r: SiteVerifyResponse) -> Self {
        CaptchaVerdict {
            success: r.success,
            score: r.score,
            action: r.action,
        }
    }
}

pub struct RecaptchaVerifier {
    client: Client,
    secret: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(client: Client, secret: impl Into<String>) -> Self {
        Self {
            client,
            secret: secret.into(),
            verify_url: RECAPTCHA_VERIFY_URL.to_string(),
        }
    }

    /// Points the verifier at a different siteverify endpoint.
    pub fn with_verify_url(mut self, verify_url: impl Into<String>) -> Self {
        self.verify_url = verify_url.into();
        self
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, response_token: &str) -> Result<CaptchaVerdict, AppError> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", response_token)])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let body: SiteVerifyResponse = read_json(SERVICE, response).await?;
        if !body.error_codes.is_empty() {
            tracing::debug!(
                error_codes = ?body.error_codes,
                "Captcha verification reported errors"
            );
        }

        Ok(body.into())
    }
}
