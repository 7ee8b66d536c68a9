//! Identity reconciliation: maps provider assertions onto local users.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::entities::{NewUser, User};
use crate::domain::identity::IdentityAssertion;
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuppliedName {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

/// Out-of-band profile some providers post alongside the authorization code
/// (`{"name":{"firstName":..,"lastName":..}}`), only on first consent.
#[derive(Deserialize)]
struct SuppliedUserData {
    name: Option<SuppliedName>,
}

/// Service that finds or creates the local user for an external identity and
/// keeps the provider-owned profile fields current.
pub struct IdentityService {
    user_repository: Arc<dyn UserRepository>,
}

impl IdentityService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// Finds or creates the user for `(provider, external_id)`.
    ///
    /// An existing user is updated only if email, name or avatar differ from the
    /// assertion. The returned user always carries the stored id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a concurrent reconcile created the same
    /// identity first. Retrying once resolves it.
    /// Returns [`AppError::Internal`] on storage failure.
    pub async fn reconcile(&self, assertion: IdentityAssertion) -> Result<User, AppError> {
        let existing = self
            .user_repository
            .find_by_provider(assertion.provider, &assertion.external_id)
            .await?;

        let Some(existing) = existing else {
            let created = self
                .user_repository
                .create(NewUser {
                    provider: assertion.provider,
                    provider_user_id: assertion.external_id.clone(),
                    email: assertion.email,
                    name: assertion.name,
                    avatar_url: assertion.avatar_url,
                })
                .await
                .map_err(|e| match e {
                    AppError::Conflict { .. } => AppError::conflict(
                        "User is being created concurrently, retry",
                        json!({ "provider": assertion.provider.as_str() }),
                    ),
                    other => other,
                })?;

            metrics::counter!("users_reconciled_total", "outcome" => "created").increment(1);
            info!(user_id = created.id, provider = %created.provider, "User created");
            return Ok(created);
        };

        let Some(changes) = existing.profile_changes(&assertion.profile()) else {
            metrics::counter!("users_reconciled_total", "outcome" => "unchanged").increment(1);
            return Ok(existing);
        };

        let updated = self
            .user_repository
            .update_profile(existing.id, changes)
            .await?;

        metrics::counter!("users_reconciled_total", "outcome" => "updated").increment(1);
        info!(user_id = updated.id, provider = %updated.provider, "User profile updated");

        Ok(updated)
    }

    /// Fills an empty asserted name from the provider's out-of-band user payload.
    ///
    /// Best effort: an unparseable payload is logged and ignored, never fatal.
    /// A name already present in the assertion always wins.
    pub fn merge_supplied_name(assertion: &mut IdentityAssertion, user_data: Option<&str>) {
        if !assertion.name.is_empty() {
            return;
        }
        let Some(raw) = user_data.map(str::trim).filter(|s| !s.is_empty()) else {
            return;
        };

        match serde_json::from_str::<SuppliedUserData>(raw) {
            Ok(SuppliedUserData { name: Some(name) }) => {
                let full = [name.first_name.trim(), name.last_name.trim()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                assertion.name = full;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    provider = %assertion.provider,
                    error = %e,
                    "Ignoring unparseable user payload"
                );
            }
        }
    }
}
