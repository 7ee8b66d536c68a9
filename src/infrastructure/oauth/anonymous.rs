use async_trait::async_trait;
use serde_json::json;

use super::authorization_url;
use crate::domain::entities::ProviderKind;
use crate::domain::identity::{IdentityAssertion, IdentityProvider};
use crate::error::AppError;
use crate::utils::secret::{TOKEN_BYTES, random_secret};

const ANONYMOUS_NAME: &str = "Anonymous";

/// Provider for users who do not want to link an external account.
///
/// The "authorization" step redirects straight back to our own callback with a
/// freshly generated random code, and that code becomes the external id. Whoever
/// holds the code owns the identity.
pub struct AnonymousProvider {
    callback_url: String,
}

impl AnonymousProvider {
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for AnonymousProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anonymous
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        let code = random_secret(TOKEN_BYTES)?;
        authorization_url(&self.callback_url, &[("code", &code), ("state", state)])
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError> {
        let well_formed = code.len() >= 32
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !well_formed {
            return Err(AppError::bad_request(
                "Malformed anonymous code",
                json!({ "length": code.len() }),
            ));
        }

        Ok(IdentityAssertion::new(ProviderKind::Anonymous, code).with_name(ANONYMOUS_NAME))
    }
}
