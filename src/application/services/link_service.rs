//! Link issuance, resolution and owner operations.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::codec::{CodecError, IdCodec};
use crate::domain::entities::{ExpiryPolicy, Link, LinkInsert, LinkPage, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::url_normalizer::normalize_url;

/// Request to shorten a URL on behalf of an owner.
#[derive(Debug, Clone)]
pub struct CreateLinkCommand {
    pub owner_id: i64,
    pub url: String,
    pub expiry: ExpiryPolicy,
}

/// A link together with its public hash.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortLink {
    pub hash: String,
    pub link: Link,
    /// False when an existing link for the same owner and URL was returned.
    pub created: bool,
}

/// Service for issuing and managing short links.
///
/// Handles URL normalization, idempotent persistence and the id/hash mapping.
/// Short hashes are never stored; they are derived from the numeric id.
pub struct LinkService {
    link_repository: Arc<dyn LinkRepository>,
    codec: Arc<dyn IdCodec>,
    base_url: String,
}

impl LinkService {
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        codec: Arc<dyn IdCodec>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            link_repository,
            codec,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates (or returns the existing) short link for an owner and URL.
    ///
    /// # Deduplication
    ///
    /// The URL is normalized first. If the owner already has an active link for
    /// the normalized URL, that link is returned with `created == false` and its
    /// original expiry is left untouched. Concurrent callers for the same key all
    /// receive the same hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is empty or cannot be normalized.
    /// Returns [`AppError::Internal`] on storage failure, if the winning row of a
    /// uniqueness race cannot be read back, or if the id cannot be encoded.
    pub async fn create_link(&self, cmd: CreateLinkCommand) -> Result<ShortLink, AppError> {
        let normalized_url = normalize_url(&cmd.url).map_err(|e| {
            AppError::bad_request("Invalid URL", json!({ "reason": e.to_string() }))
        })?;

        let new_link = NewLink::new(cmd.owner_id, normalized_url, cmd.expiry, Utc::now());

        let (link, created) = match self.link_repository.create_or_fetch(new_link).await {
            Ok(LinkInsert::Created(link)) => (link, true),
            Ok(LinkInsert::Existing(link)) => (link, false),
            Ok(LinkInsert::Vanished) => {
                metrics::counter!("links_created_total", "outcome" => "error").increment(1);
                return Err(AppError::internal(
                    "Link not found after insert conflict",
                    json!({ "owner_id": cmd.owner_id }),
                ));
            }
            Err(e) => {
                metrics::counter!("links_created_total", "outcome" => "error").increment(1);
                return Err(e);
            }
        };

        let hash = self.encode_id(link.id)?;

        let outcome = if created { "created" } else { "reused" };
        metrics::counter!("links_created_total", "outcome" => outcome).increment(1);
        info!(link_id = link.id, owner_id = link.user_id, %hash, outcome, "Link issued");

        Ok(ShortLink {
            hash,
            link,
            created,
        })
    }

    /// Resolves a public hash to a live link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the hash is not canonical, or the link is
    /// missing, deleted or expired.
    /// Returns [`AppError::Internal`] on storage failure.
    pub async fn resolve(&self, hash: &str) -> Result<Link, AppError> {
        let id = self.decode_hash(hash)?;

        self.link_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "hash": hash })))
    }

    /// Lists an owner's live links, newest first, each paired with its hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage or codec failure.
    pub async fn list_links(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ShortLink>, i64), AppError> {
        let LinkPage { links, total } = self
            .link_repository
            .list_by_owner(owner_id, limit, offset)
            .await?;

        let items = links
            .into_iter()
            .map(|link| {
                Ok(ShortLink {
                    hash: self.encode_id(link.id)?,
                    link,
                    created: false,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok((items, total))
    }

    /// Re-times an owner's link. The new expiry is computed from now.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the hash is unknown or the link belongs
    /// to someone else.
    pub async fn change_expiry(
        &self,
        owner_id: i64,
        hash: &str,
        expiry: ExpiryPolicy,
    ) -> Result<ShortLink, AppError> {
        let id = self.decode_hash(hash)?;
        let expires_at = expiry.expires_at(Utc::now());

        let link = self
            .link_repository
            .update_expiry(id, owner_id, expiry, expires_at)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "hash": hash })))?;

        info!(link_id = link.id, %expiry, "Link expiry changed");

        Ok(ShortLink {
            hash: hash.to_string(),
            link,
            created: false,
        })
    }

    /// Soft-deletes an owner's link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no active link with this hash belongs
    /// to the owner.
    pub async fn delete_link(&self, owner_id: i64, hash: &str) -> Result<(), AppError> {
        let id = self.decode_hash(hash)?;

        if !self.link_repository.soft_delete(id, owner_id).await? {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "hash": hash }),
            ));
        }

        info!(link_id = id, owner_id, "Link deleted");
        Ok(())
    }

    /// Retires every expired link. Returns the number retired.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.link_repository.purge_expired().await
    }

    pub async fn health_check(&self) -> bool {
        self.link_repository.health_check().await
    }

    /// Constructs the public short URL for a hash.
    pub fn short_url(&self, hash: &str) -> String {
        format!("{}/{}", self.base_url, hash)
    }

    /// Maps a link id to its public hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the id is negative or the codec fails.
    pub fn encode_id(&self, id: i64) -> Result<String, AppError> {
        let raw = u64::try_from(id).map_err(|_| {
            AppError::internal("Negative link id", json!({ "link_id": id }))
        })?;

        self.codec.encode(raw).map_err(|e| {
            AppError::internal("Failed to encode link id", json!({ "reason": e.to_string() }))
        })
    }

    /// Maps a public hash back to a link id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for anything that is not the canonical
    /// encoding of a single id.
    pub fn decode_hash(&self, hash: &str) -> Result<i64, AppError> {
        let not_found = || AppError::not_found("Short link not found", json!({ "hash": hash }));

        match self.codec.decode(hash) {
            Ok(raw) => i64::try_from(raw).map_err(|_| not_found()),
            Err(CodecError::Malformed(_)) => {
                debug!(%hash, "Rejected non-canonical hash");
                Err(not_found())
            }
            Err(e) => Err(AppError::internal(
                "Failed to decode hash",
                json!({ "reason": e.to_string() }),
            )),
        }
    }
}
