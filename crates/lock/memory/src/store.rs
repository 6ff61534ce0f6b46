use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use keylock::{LockStore, StoreError};

/// Internal entry representing a held key.
#[derive(Debug, Clone)]
struct LockEntry {
    token: String,
    /// `None` when the TTL lies beyond what the clock can represent.
    expires_at: Option<Instant>,
}

impl LockEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory [`LockStore`] backed by a [`DashMap`].
///
/// Expiry is lazy: an expired entry is evicted by the next operation on the
/// same key. Time follows the tokio clock, so paused-time tests can advance
/// past a TTL without sleeping. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    entries: Arc<DashMap<String, LockEntry>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token for `key`, if held and not expired.
    pub fn token(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.token.clone())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.entries.remove_if(key, |_, entry| entry.is_expired());

        // The entry guard holds the shard lock, making check-and-insert atomic.
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry {
                    token: token.to_owned(),
                    expires_at: Instant::now().checked_add(ttl),
                });
                Ok(true)
            }
        }
    }

    async fn delete_if_equals(&self, key: &str, token: &str) -> Result<bool, StoreError> {
        let removed = self
            .entries
            .remove_if(key, |_, entry| !entry.is_expired() && entry.token == token);
        if removed.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(removed.is_some())
    }
}

#[cfg(test)]
mod tests {
    use keylock::testing::run_lock_conformance_tests;
    use keylock::{LockError, LockManager};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn conformance() {
        let manager = LockManager::new(Arc::new(MemoryLockStore::new()));
        run_lock_conformance_tests(&manager)
            .await
            .expect("lock conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn lock_expires_after_ttl() {
        let store = MemoryLockStore::new();
        let manager = LockManager::new(Arc::new(store.clone()));

        let lock = manager
            .acquire("expire-lock", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(store.token("expire-lock").as_deref(), Some(lock.token()));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(store.token("expire-lock").is_none());

        let next = manager
            .acquire("expire-lock", Duration::from_secs(10))
            .await
            .expect("should acquire after TTL expiry");
        assert_ne!(next.token(), lock.token());
    }

    #[tokio::test(start_paused = true)]
    async fn longest_expiration_does_not_expire() {
        let store = MemoryLockStore::new();
        let manager = LockManager::new(Arc::new(store.clone()));

        let lock = manager
            .acquire("long-lock", keylock::MAX_EXPIRATION)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;

        assert_eq!(store.token("long-lock").as_deref(), Some(lock.token()));
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let store = MemoryLockStore::new();
        assert!(
            store
                .set_if_absent("forever", "t1", Duration::MAX)
                .await
                .unwrap()
        );

        assert_eq!(store.token("forever").as_deref(), Some("t1"));
        assert!(!store.set_if_absent("forever", "t2", Duration::from_secs(1)).await.unwrap());
        assert!(store.delete_if_equals("forever", "t1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_cannot_delete() {
        let store = MemoryLockStore::new();
        store
            .set_if_absent("k", "t1", Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!store.delete_if_equals("k", "t1").await.unwrap());
        assert!(store.entries.is_empty(), "expired entry should be evicted");
    }

    #[tokio::test]
    async fn delete_requires_matching_token() {
        let store = MemoryLockStore::new();
        store
            .set_if_absent("k", "t1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!store.delete_if_equals("k", "t2").await.unwrap());
        assert_eq!(store.token("k").as_deref(), Some("t1"));
        assert!(store.delete_if_equals("k", "t1").await.unwrap());
        assert!(store.token("k").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquire_has_single_winner() {
        let manager = LockManager::new(Arc::new(MemoryLockStore::new()));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.acquire("race", Duration::from_secs(30)).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(LockError::Conflict(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners, 1);
    }
}
