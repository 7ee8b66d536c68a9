//! Link entity representing a shortened redirect mapping.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::RecordState;

/// Lifetime policy chosen when a link is created.
///
/// Stored as its wire name (`"3months"`, ..., `"never"`) and converted into an
/// absolute `expires_at` at creation or when the owner changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExpiryPolicy {
    #[default]
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "12months")]
    TwelveMonths,
    #[serde(rename = "never")]
    Never,
}

impl ExpiryPolicy {
    pub const ALL: [ExpiryPolicy; 4] = [
        Self::ThreeMonths,
        Self::SixMonths,
        Self::TwelveMonths,
        Self::Never,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::TwelveMonths => "12months",
            Self::Never => "never",
        }
    }

    fn months(self) -> Option<u32> {
        match self {
            Self::ThreeMonths => Some(3),
            Self::SixMonths => Some(6),
            Self::TwelveMonths => Some(12),
            Self::Never => None,
        }
    }

    /// Computes the absolute expiry for a link created (or re-timed) at `from`.
    ///
    /// Calendar months are added, clamping to the last day of the target month
    /// (Nov 30 + 3 months is Feb 28/29). `Never` yields `None`.
    pub fn expires_at(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.months().map(|m| {
            from.checked_add_months(Months::new(m))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expiry policy '{0}', expected one of 3months, 6months, 12months, never")]
pub struct UnknownExpiryPolicy(pub String);

impl FromStr for ExpiryPolicy {
    type Err = UnknownExpiryPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownExpiryPolicy(s.to_string()))
    }
}

/// A redirect mapping owned by a user.
///
/// The public short hash is never stored: it is derived from `id` by the
/// configured [`IdCodec`](crate::domain::codec::IdCodec).
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub user_id: i64,
    pub redirect_url: String,
    pub expiry_policy: ExpiryPolicy,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: RecordState,
}

impl Link {
    pub fn is_deleted(&self) -> bool {
        self.state.is_deleted()
    }

    /// Returns true once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// A link resolves only while it is neither deleted nor expired.
    pub fn is_resolvable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted() && !self.is_expired_at(now)
    }
}

/// Input data for creating a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub user_id: i64,
    pub redirect_url: String,
    pub expiry_policy: ExpiryPolicy,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewLink {
    pub fn new(
        user_id: i64,
        redirect_url: String,
        expiry_policy: ExpiryPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            redirect_url,
            expiry_policy,
            expires_at: expiry_policy.expires_at(now),
        }
    }
}

/// Outcome of an idempotent insert keyed by `(user_id, redirect_url)`.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkInsert {
    /// A new row was written.
    Created(Link),
    /// An active row for the same owner and URL already existed.
    Existing(Link),
    /// The insert lost a uniqueness race and the winning row was gone by the
    /// time it was read back.
    Vanished,
}

/// One page of an owner's links plus the total matching count.
#[derive(Debug, Clone, Default)]
pub struct LinkPage {
    pub links: Vec<Link>,
    pub total: i64,
}
