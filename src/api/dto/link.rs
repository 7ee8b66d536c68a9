//! DTOs for link endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::dto::pagination::PageMeta;
use crate::application::services::ShortLink;
use crate::domain::entities::ExpiryPolicy;

/// Body of `POST /api/links`.
///
/// `ttl` is one of `3months`, `6months`, `12months`, `never`. Anonymous callers
/// always get `3months`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, max = 4096, message = "URL must be 1 to 4096 characters"))]
    pub url: String,

    #[serde(default)]
    pub ttl: Option<ExpiryPolicy>,
}

/// Body of `PATCH /api/links/{hash}`.
#[derive(Debug, Deserialize)]
pub struct UpdateLinkRequest {
    pub ttl: ExpiryPolicy,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub hash: String,
    pub short_url: String,
    pub url: String,
    pub ttl: ExpiryPolicy,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn new(short: ShortLink, short_url: String) -> Self {
        Self {
            hash: short.hash,
            short_url,
            url: short.link.redirect_url,
            ttl: short.link.expiry_policy,
            expires_at: short.link.expires_at,
            created_at: short.link.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub items: Vec<LinkResponse>,
    pub pagination: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_ttl_is_optional() {
        let req: CreateLinkRequest =
            serde_json::from_str(r#"{"url":"https://example.com"}"#).unwrap();
        assert!(req.ttl.is_none());

        let req: CreateLinkRequest =
            serde_json::from_str(r#"{"url":"https://example.com","ttl":"12months"}"#).unwrap();
        assert_eq!(req.ttl, Some(ExpiryPolicy::TwelveMonths));
    }

    #[test]
    fn test_unknown_ttl_rejected() {
        assert!(
            serde_json::from_str::<CreateLinkRequest>(r#"{"url":"x","ttl":"forever"}"#).is_err()
        );
    }

    #[test]
    fn test_empty_url_fails_validation() {
        let req: CreateLinkRequest = serde_json::from_str(r#"{"url":""}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
