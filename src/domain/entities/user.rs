//! User entity reconciled from an external identity provider.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordState;

/// Identity provider family.
///
/// Persisted as a small integer (`provider_type` column). The mapping is
/// append-only: new providers get new codes, existing codes never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anonymous,
    Google,
    Apple,
    Github,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::Anonymous, Self::Google, Self::Apple, Self::Github];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Github => "github",
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Anonymous => 1,
            Self::Google => 2,
            Self::Apple => 3,
            Self::Github => 4,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown identity provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// A user known by `(provider, provider_user_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub provider: ProviderKind,
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: RecordState,
}

impl User {
    /// Returns the mutable profile fields as they are stored now.
    pub fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Compares the stored profile with what a provider just asserted.
    ///
    /// Returns `None` when every field already matches, so callers can skip
    /// the write entirely.
    pub fn profile_changes(&self, asserted: &ProfileUpdate) -> Option<ProfileUpdate> {
        if self.profile() == *asserted {
            None
        } else {
            Some(asserted.clone())
        }
    }
}

/// Input data for creating a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub provider: ProviderKind,
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

/// Replacement values for the provider-owned profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}
