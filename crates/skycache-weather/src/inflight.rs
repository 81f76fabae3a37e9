//! Per-city refresh guard.
//!
//! Concurrent refreshes of the same city queue on one async mutex so only the
//! first calls the provider; later waiters re-read the store. Distinct cities
//! never contend, and entries are dropped once nobody holds or awaits them,
//! including waiters whose request was cancelled.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

/// Keyed async locks, one per city name.
#[derive(Debug, Default)]
pub struct CityLocks {
    locks: Mutex<HashMap<String, Entry>>,
}

/// A claim on a city's entry, released on drop whether or not the lock
/// was ever obtained.
#[derive(Debug)]
struct Claim<'a> {
    owner: &'a CityLocks,
    city: String,
}

/// Held while a city is being refreshed.
#[derive(Debug)]
pub struct CityGuard<'a> {
    // Field order matters: the mutex is released before the claim.
    _guard: OwnedMutexGuard<()>,
    _claim: Claim<'a>,
}

impl CityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive refresh rights on `city`.
    pub async fn acquire(&self, city: &str) -> CityGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            let entry = locks.entry(city.to_string()).or_insert_with(|| Entry {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            entry.users += 1;
            entry.lock.clone()
        };
        let claim = Claim {
            owner: self,
            city: city.to_string(),
        };

        let guard = lock.lock_owned().await;
        CityGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock();
        if let Some(entry) = locks.get_mut(&self.city) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                locks.remove(&self.city);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = CityLocks::new();
        {
            let _guard = locks.acquire("Dublin").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_cities_do_not_contend() {
        let locks = CityLocks::new();
        let _dublin = locks.acquire("Dublin").await;

        let paris = tokio::time::timeout(Duration::from_millis(100), locks.acquire("Paris")).await;
        assert!(paris.is_ok());
    }

    #[tokio::test]
    async fn test_same_city_waits_for_release() {
        let locks = Arc::new(CityLocks::new());
        let first = locks.acquire("Dublin").await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("Dublin")).await;
        assert!(blocked.is_err());

        drop(first);
        let second =
            tokio::time::timeout(Duration::from_millis(100), locks.acquire("Dublin")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let locks = CityLocks::new();
        let _upper = locks.acquire("Dublin").await;
        let lower = tokio::time::timeout(Duration::from_millis(100), locks.acquire("dublin")).await;
        assert!(lower.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = CityLocks::new();
        let holder = locks.acquire("Dublin").await;

        let mut waiter = Box::pin(locks.acquire("Dublin"));
        let pending = tokio::time::timeout(Duration::from_millis(20), &mut waiter).await;
        assert!(pending.is_err());

        // The holder leaves while the waiter is still queued, then the waiter gives up.
        drop(holder);
        drop(waiter);

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiter_queued() {
        let locks = Arc::new(CityLocks::new());
        let holder = locks.acquire("Dublin").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("Dublin").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(holder);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
