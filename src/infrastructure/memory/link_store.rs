use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::entities::{ExpiryPolicy, Link, LinkInsert, LinkPage, NewLink, RecordState};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

#[derive(Default)]
struct Links {
    next_id: i64,
    rows: BTreeMap<i64, Link>,
    // (owner, url) of every non-deleted row
    active_keys: HashMap<(i64, String), i64>,
}

impl Links {
    fn active_for_key_mut(&mut self, user_id: i64, url: &str) -> Option<&mut Link> {
        let id = *self.active_keys.get(&(user_id, url.to_string()))?;
        self.rows.get_mut(&id)
    }

    fn retire(&mut self, id: i64, now: DateTime<Utc>) {
        if let Some(link) = self.rows.get_mut(&id) {
            link.state = RecordState::Deleted;
            link.updated_at = now;
            self.active_keys
                .remove(&(link.user_id, link.redirect_url.clone()));
        }
    }
}

/// In-process link store.
///
/// One mutex guards the whole table, so insert-or-fetch is atomic without any
/// retry loop.
#[derive(Default)]
pub struct MemoryLinkRepository {
    inner: Mutex<Links>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts a link's expiry by `delta`. Test hook for expiry scenarios.
    pub fn backdate_expiry(&self, id: i64, delta: chrono::TimeDelta) {
        if let Some(link) = self.inner.lock().rows.get_mut(&id)
            && let Some(expires_at) = link.expires_at
        {
            link.expires_at = Some(expires_at - delta);
        }
    }

    /// Number of rows ever written, deleted ones included.
    pub fn row_count(&self) -> usize {
        self.inner.lock().rows.len()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create_or_fetch(&self, new_link: NewLink) -> Result<LinkInsert, AppError> {
        let now = Utc::now();
        let mut links = self.inner.lock();

        if let Some(existing) = links.active_for_key_mut(new_link.user_id, &new_link.redirect_url) {
            if !existing.is_expired_at(now) {
                return Ok(LinkInsert::Existing(existing.clone()));
            }
            let id = existing.id;
            links.retire(id, now);
        }

        links.next_id += 1;
        let link = Link {
            id: links.next_id,
            user_id: new_link.user_id,
            redirect_url: new_link.redirect_url,
            expiry_policy: new_link.expiry_policy,
            expires_at: new_link.expires_at,
            created_at: now,
            updated_at: now,
            state: RecordState::Active,
        };
        links
            .active_keys
            .insert((link.user_id, link.redirect_url.clone()), link.id);
        links.rows.insert(link.id, link.clone());

        Ok(LinkInsert::Created(link))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let now = Utc::now();
        Ok(self
            .inner
            .lock()
            .rows
            .get(&id)
            .filter(|l| l.is_resolvable_at(now))
            .cloned())
    }

    async fn list_by_owner(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<LinkPage, AppError> {
        let now = Utc::now();
        let links = self.inner.lock();

        // ids grow with creation time, so reverse id order is newest first
        let owned: Vec<&Link> = links
            .rows
            .values()
            .rev()
            .filter(|l| l.user_id == user_id && l.is_resolvable_at(now))
            .collect();

        let page = owned
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|l| (*l).clone())
            .collect();

        Ok(LinkPage {
            links: page,
            total: owned.len() as i64,
        })
    }

    async fn update_expiry(
        &self,
        id: i64,
        user_id: i64,
        policy: ExpiryPolicy,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Link>, AppError> {
        let mut links = self.inner.lock();

        let Some(link) = links
            .rows
            .get_mut(&id)
            .filter(|l| l.user_id == user_id && !l.is_deleted())
        else {
            return Ok(None);
        };

        link.expiry_policy = policy;
        link.expires_at = expires_at;
        link.updated_at = Utc::now();

        Ok(Some(link.clone()))
    }

    async fn soft_delete(&self, id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut links = self.inner.lock();

        let owned = links
            .rows
            .get(&id)
            .is_some_and(|l| l.user_id == user_id && !l.is_deleted());
        if owned {
            links.retire(id, Utc::now());
        }

        Ok(owned)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut links = self.inner.lock();

        let expired: Vec<i64> = links
            .active_keys
            .values()
            .copied()
            .filter(|id| links.rows.get(id).is_some_and(|l| l.is_expired_at(now)))
            .collect();
        for &id in &expired {
            links.retire(id, now);
        }

        Ok(expired.len() as u64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
