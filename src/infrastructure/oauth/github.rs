use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{OAuthClientConfig, TokenResponse, authorization_url};
use crate::domain::entities::ProviderKind;
use crate::domain::identity::{IdentityAssertion, IdentityProvider};
use crate::error::AppError;
use crate::infrastructure::http::{read_json, transport_error};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const EMAILS_URL: &str = "https://api.github.com/user/emails";
const SCOPES: &str = "user:email read:user";
const API_MEDIA_TYPE: &str = "application/vnd.github+json";
const SERVICE: &str = "github";

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    avatar_url: String,
}

impl GithubUser {
    /// Email published on the profile, if the user chose to make one public.
    fn public_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    fn into_assertion(self, email: String) -> IdentityAssertion {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.login,
        };

        IdentityAssertion::new(ProviderKind::Github, self.id.to_string())
            .with_email(email)
            .with_name(name)
            .with_avatar_url(self.avatar_url)
    }
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

fn primary_verified_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

pub struct GithubProvider {
    client: Client,
    config: OAuthClientConfig,
}

impl GithubProvider {
    pub fn new(client: Client, config: OAuthClientConfig) -> Self {
        Self { client, config }
    }

    async fn api_get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AppError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, API_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl IdentityProvider for GithubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        authorization_url(
            AUTHORIZE_URL,
            &[
                ("client_id", &self.config.client_id),
                ("redirect_uri", &self.config.redirect_url),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let access_token = read_json::<TokenResponse>(SERVICE, response)
            .await?
            .into_access_token(SERVICE)?;

        let user: GithubUser = self.api_get(USER_URL, &access_token).await?;

        let email = match user.public_email() {
            Some(email) => email.to_string(),
            None => {
                let emails: Vec<GithubEmail> = self.api_get(EMAILS_URL, &access_token).await?;
                primary_verified_email(emails).unwrap_or_default()
            }
        };

        Ok(user.into_assertion(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(raw: &str) -> GithubUser {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_name_falls_back_to_login() {
        let u = user(
            r#"{"id":583231,"login":"octocat","name":null,"email":null,"avatar_url":"https://a/1"}"#,
        );
        assert!(u.public_email().is_none());

        let assertion = u.into_assertion("octo@example.com".into());

        assert_eq!(assertion.external_id, "583231");
        assert_eq!(assertion.name, "octocat");
        assert_eq!(assertion.email, "octo@example.com");
    }

    #[test]
    fn test_profile_name_and_email_used_when_present() {
        let u = user(r#"{"id":1,"login":"octocat","name":"The Octocat","email":"cat@github.com"}"#);

        assert_eq!(u.public_email(), Some("cat@github.com"));
        let assertion = u.into_assertion("cat@github.com".into());
        assert_eq!(assertion.name, "The Octocat");
        assert_eq!(assertion.avatar_url, "");
    }

    #[test]
    fn test_primary_verified_email_selection() {
        let emails: Vec<GithubEmail> = serde_json::from_str(
            r#"[
                {"email":"old@example.com","primary":false,"verified":true,"visibility":null},
                {"email":"unverified@example.com","primary":true,"verified":false,"visibility":null},
                {"email":"main@example.com","primary":true,"verified":true,"visibility":"private"}
            ]"#,
        )
        .unwrap();

        assert_eq!(primary_verified_email(emails).as_deref(), Some("main@example.com"));
        assert_eq!(primary_verified_email(Vec::new()), None);
    }
}
