//! Session token entity: an access/refresh credential pair.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use super::RecordState;
use crate::error::AppError;
use crate::utils::secret::{TOKEN_BYTES, random_secret};

/// A bearer credential pair bound to one user.
///
/// The access token authorizes requests until `access_expires_at`; the refresh
/// token can mint a replacement pair until `refresh_expires_at`. Both strings
/// are globally unique.
#[derive(Clone, PartialEq)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: RecordState,
}

impl Token {
    pub fn can_be_authorized_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_deleted() && now < self.access_expires_at
    }

    pub fn can_be_refreshed_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_deleted() && now < self.refresh_expires_at
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("state", &self.state)
            .finish()
    }
}

/// Input data for persisting a freshly generated pair.
#[derive(Clone, PartialEq)]
pub struct NewToken {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl NewToken {
    /// Generates two independent random secrets and stamps both expiries from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the system RNG fails.
    pub fn generate(
        user_id: i64,
        access_ttl: TimeDelta,
        refresh_ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            user_id,
            access_token: random_secret(TOKEN_BYTES)?,
            refresh_token: random_secret(TOKEN_BYTES)?,
            access_expires_at: now + access_ttl,
            refresh_expires_at: now + refresh_ttl,
        })
    }
}

impl fmt::Debug for NewToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewToken")
            .field("user_id", &self.user_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}
