use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{OAuthClientConfig, TokenResponse, authorization_url};
use crate::domain::entities::ProviderKind;
use crate::domain::identity::{IdentityAssertion, IdentityProvider};
use crate::error::AppError;
use crate::infrastructure::http::{read_json, transport_error};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";
const SERVICE: &str = "google";

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

impl From<GoogleUserInfo> for IdentityAssertion {
    fn from(info: GoogleUserInfo) -> Self {
        IdentityAssertion::new(ProviderKind::Google, info.sub)
            .with_email(info.email)
            .with_name(info.name)
            .with_avatar_url(info.picture)
    }
}

pub struct GoogleProvider {
    client: Client,
    config: OAuthClientConfig,
}

impl GoogleProvider {
    pub fn new(client: Client, config: OAuthClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        authorization_url(
            AUTH_URL,
            &[
                ("client_id", &self.config.client_id),
                ("redirect_uri", &self.config.redirect_url),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let access_token = read_json::<TokenResponse>(SERVICE, response)
            .await?
            .into_access_token(SERVICE)?;

        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let info: GoogleUserInfo = read_json(SERVICE, response).await?;

        Ok(info.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_userinfo_maps_to_assertion() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub":"1098","email":"ada@gmail.com","email_verified":true,"name":"Ada","picture":"https://lh3.example/a.jpg"}"#,
        )
        .unwrap();
        let assertion: IdentityAssertion = info.into();

        assert_eq!(assertion.external_id, "1098");
        assert_eq!(assertion.email, "ada@gmail.com");
        assert_eq!(assertion.avatar_url, "https://lh3.example/a.jpg");
    }

    #[test]
    fn test_authorization_url_carries_client_and_state() {
        let provider = GoogleProvider::new(
            Client::new(),
            OAuthClientConfig {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                redirect_url: "https://sho.rt/api/auth/google/callback".into(),
            },
        );

        let url = provider.authorization_url("xyz").unwrap();

        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=xyz"));
        assert!(!url.contains("secret"));
    }
}
