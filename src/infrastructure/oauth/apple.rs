use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{TokenResponse, authorization_url};
use crate::domain::entities::ProviderKind;
use crate::domain::identity::{IdentityAssertion, IdentityProvider};
use crate::error::AppError;
use crate::infrastructure::http::{read_json, transport_error};
use crate::utils::refresh_ahead::RefreshAhead;

const AUTHORIZE_URL: &str = "https://appleid.apple.com/auth/authorize";
const TOKEN_URL: &str = "https://appleid.apple.com/auth/token";
const APPLE_ISSUER: &str = "https://appleid.apple.com";
const SCOPES: &str = "name email";
const SERVICE: &str = "apple";

/// Apple accepts client secrets valid for up to six months; we keep them short.
const CLIENT_SECRET_LIFETIME: TimeDelta = TimeDelta::hours(16);
const CLIENT_SECRET_MARGIN: TimeDelta = TimeDelta::minutes(30);

/// Sign in with Apple registration.
#[derive(Clone)]
pub struct AppleConfig {
    /// Services ID, used as `client_id` and as the ID token audience.
    pub client_id: String,
    pub team_id: String,
    pub key_id: String,
    /// PKCS#8 PEM of the P-256 signing key downloaded from the developer portal.
    pub private_key_pem: String,
    pub redirect_url: String,
}

impl std::fmt::Debug for AppleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppleConfig")
            .field("client_id", &self.client_id)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key_pem", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ClientSecretClaims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    aud: &'a str,
    sub: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

pub struct AppleProvider {
    client: Client,
    config: AppleConfig,
    signing_key: EncodingKey,
    client_secret: RefreshAhead<String>,
}

impl AppleProvider {
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the private key is not a valid EC PEM.
    pub fn new(client: Client, config: AppleConfig) -> Result<Self, AppError> {
        let signing_key = EncodingKey::from_ec_pem(config.private_key_pem.as_bytes()).map_err(|e| {
            AppError::internal(
                "Invalid Apple signing key",
                json!({ "key_id": config.key_id, "reason": e.to_string() }),
            )
        })?;

        Ok(Self {
            client,
            config,
            signing_key,
            client_secret: RefreshAhead::new(CLIENT_SECRET_MARGIN),
        })
    }

    /// Returns a signed client secret, reusing the cached one until it nears expiry.
    fn client_secret(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        self.client_secret.get_or_issue(now, |now| {
            let expires_at = now + CLIENT_SECRET_LIFETIME;

            let mut header = Header::new(Algorithm::ES256);
            header.kid = Some(self.config.key_id.clone());

            let claims = ClientSecretClaims {
                iss: &self.config.team_id,
                iat: now.timestamp(),
                exp: expires_at.timestamp(),
                aud: APPLE_ISSUER,
                sub: &self.config.client_id,
            };

            let secret = jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|e| {
                AppError::internal(
                    "Failed to sign Apple client secret",
                    json!({ "reason": e.to_string() }),
                )
            })?;

            tracing::debug!(expires_at = %expires_at, "Issued Apple client secret");
            Ok((secret, expires_at))
        })
    }
}

/// Reads the identity out of an ID token received directly from Apple's token
/// endpoint over TLS. Issuer, audience and expiry are validated; the signature
/// is not, as the token did not pass through the user agent.
fn identity_from_id_token(id_token: &str, client_id: &str) -> Result<IdentityAssertion, AppError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.set_audience(&[client_id]);
    validation.set_issuer(&[APPLE_ISSUER]);

    let data = jsonwebtoken::decode::<IdTokenClaims>(
        id_token,
        &DecodingKey::from_secret(&[]),
        &validation,
    )
    .map_err(|e| {
        AppError::upstream(
            "apple returned an unusable ID token",
            json!({ "service": SERVICE, "reason": e.to_string() }),
        )
    })?;

    let claims = data.claims;
    Ok(IdentityAssertion::new(ProviderKind::Apple, claims.sub)
        .with_email(claims.email.unwrap_or_default()))
}

#[async_trait]
impl IdentityProvider for AppleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Apple
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        authorization_url(
            AUTHORIZE_URL,
            &[
                ("client_id", &self.config.client_id),
                ("redirect_uri", &self.config.redirect_url),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("response_mode", "form_post"),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AppError> {
        let client_secret = self.client_secret(Utc::now())?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let id_token = read_json::<TokenResponse>(SERVICE, response)
            .await?
            .into_id_token(SERVICE)?;

        identity_from_id_token(&id_token, &self.config.client_id)
    }
}
