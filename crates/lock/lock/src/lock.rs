use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::LockError;
use crate::store::{LockStore, bounded};

/// A successful acquisition of a named lock.
///
/// The handle proves ownership only while the store still maps `key` to
/// `token`. The store may expire the entry at any point after
/// `expiration`; the handle does not notice until [`release`](Self::release)
/// reports [`LockError::NotHeld`].
///
/// Dropping a `Lock` without releasing it is allowed; the key is reclaimed
/// by the store's TTL.
pub struct Lock {
    store: Arc<dyn LockStore>,
    key: String,
    token: String,
    expiration: Duration,
    operation_timeout: Option<Duration>,
}

impl Lock {
    pub(crate) fn new(
        store: Arc<dyn LockStore>,
        key: String,
        token: String,
        expiration: Duration,
        operation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            key,
            token,
            expiration,
            operation_timeout,
        }
    }

    /// The locked resource name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The ownership token stored under the key at acquisition.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The TTL requested at acquisition.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Release the lock if this handle still owns it.
    ///
    /// Runs a single atomic compare-and-delete on the store. Succeeds only
    /// when a deletion actually happened; otherwise returns
    /// [`LockError::NotHeld`] (already released, expired, or re-acquired by
    /// another holder). Calling it again after a successful release returns
    /// `NotHeld`.
    pub async fn release(&self) -> Result<(), LockError> {
        let deleted = bounded(
            self.operation_timeout,
            self.store.delete_if_equals(&self.key, &self.token),
        )
        .await?;

        if deleted {
            debug!(key = %self.key, "released lock");
            Ok(())
        } else {
            debug!(key = %self.key, "lock was not held by this owner at release time");
            Err(LockError::NotHeld(self.key.clone()))
        }
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}
