//! Single-slot cache for values that must be reissued shortly before they expire.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

struct Issued<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// Holds one issued value and regenerates it once fewer than `margin` remain
/// before its expiry.
///
/// The slot lock is held across regeneration, so concurrent readers that find
/// the value stale wait for one regeneration instead of each running their own.
/// The issuer must therefore be synchronous and cheap.
pub struct RefreshAhead<T> {
    slot: Mutex<Option<Issued<T>>>,
    margin: TimeDelta,
}

impl<T: Clone> RefreshAhead<T> {
    pub fn new(margin: TimeDelta) -> Self {
        Self {
            slot: Mutex::new(None),
            margin,
        }
    }

    /// Returns the cached value, or calls `issue(now)` to replace it.
    ///
    /// `issue` returns the new value together with its absolute expiry. On
    /// error the previous value (if any) is kept and the error is returned.
    pub fn get_or_issue<E, F>(&self, now: DateTime<Utc>, issue: F) -> Result<T, E>
    where
        F: FnOnce(DateTime<Utc>) -> Result<(T, DateTime<Utc>), E>,
    {
        let mut slot = self.slot.lock();

        if let Some(issued) = slot.as_ref()
            && now + self.margin < issued.expires_at
        {
            return Ok(issued.value.clone());
        }

        let (value, expires_at) = issue(now)?;
        *slot = Some(Issued {
            value: value.clone(),
            expires_at,
        });

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn issuer(
        counter: &AtomicUsize,
        lifetime: Duration,
    ) -> impl FnOnce(DateTime<Utc>) -> Result<(usize, DateTime<Utc>), ()> + '_ {
        move |now| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n, now + lifetime))
        }
    }

    #[test]
    fn test_reuses_until_margin() {
        let cache = RefreshAhead::new(Duration::minutes(30));
        let issued = AtomicUsize::new(0);
        let t0 = Utc::now();

        assert_eq!(cache.get_or_issue(t0, issuer(&issued, Duration::hours(16))), Ok(1));
        assert_eq!(
            cache.get_or_issue(t0 + Duration::hours(15), issuer(&issued, Duration::hours(16))),
            Ok(1)
        );

        // 15h31m in: less than 30 minutes left
        assert_eq!(
            cache.get_or_issue(
                t0 + Duration::hours(15) + Duration::minutes(31),
                issuer(&issued, Duration::hours(16))
            ),
            Ok(2)
        );
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_issue_keeps_previous_value() {
        let cache = RefreshAhead::new(Duration::minutes(30));
        let t0 = Utc::now();

        assert_eq!(
            cache.get_or_issue::<&str, _>(t0, |now| Ok(("first", now + Duration::hours(1)))),
            Ok("first")
        );
        assert_eq!(
            cache.get_or_issue(t0 + Duration::hours(2), |_| Err("signing failed")),
            Err("signing failed")
        );
    }

    #[test]
    fn test_concurrent_callers_issue_once() {
        let cache = Arc::new(RefreshAhead::new(Duration::minutes(30)));
        let issued = Arc::new(AtomicUsize::new(0));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let issued = issued.clone();
                std::thread::spawn(move || {
                    cache.get_or_issue::<(), _>(now, |now| {
                        issued.fetch_add(1, Ordering::SeqCst);
                        Ok(("secret".to_string(), now + Duration::hours(16)))
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok("secret".to_string()));
        }
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }
}
