use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::LockError;
use crate::lock::Lock;
use crate::store::{LockStore, bounded};
use crate::token::{TokenGenerator, UuidTokens};

/// Longest expiration accepted by [`LockManager::acquire`] (about 136
/// years). Keeps TTL arithmetic in range for every store: Redis rejects a
/// `PX` near `i64::MAX`, and in-process clocks overflow.
pub const MAX_EXPIRATION: Duration = Duration::from_secs(4_294_967_295);

/// Issues [`Lock`] handles against a shared [`LockStore`].
///
/// The manager keeps no record of the locks it hands out; the store is the
/// only source of truth. Clones share the same store handle.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    tokens: Arc<dyn TokenGenerator>,
    operation_timeout: Option<Duration>,
}

impl LockManager {
    /// Create a manager that mints random UUID tokens and applies no
    /// deadline of its own to store calls.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            tokens: Arc::new(UuidTokens),
            operation_timeout: None,
        }
    }

    /// Replace the token generator.
    #[must_use]
    pub fn with_token_generator(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Abandon any single store call (acquire or release) after `timeout`,
    /// reporting it as [`StoreError::Timeout`](crate::StoreError::Timeout).
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Try once to acquire `key` for `expiration`.
    ///
    /// Performs one atomic set-if-absent with a TTL. Does not wait for the
    /// lock to become free: a held key yields [`LockError::Conflict`]
    /// immediately.
    pub async fn acquire(&self, key: &str, expiration: Duration) -> Result<Lock, LockError> {
        if key.is_empty() {
            return Err(LockError::InvalidRequest(
                "lock key must not be empty".to_owned(),
            ));
        }
        if expiration.is_zero() {
            return Err(LockError::InvalidRequest(format!(
                "expiration for {key} must be positive"
            )));
        }
        if expiration > MAX_EXPIRATION {
            return Err(LockError::InvalidRequest(format!(
                "expiration for {key} exceeds {MAX_EXPIRATION:?}"
            )));
        }

        let token = self.tokens.generate();
        let acquired = bounded(
            self.operation_timeout,
            self.store.set_if_absent(key, &token, expiration),
        )
        .await?;

        if !acquired {
            debug!(key, "lock already held");
            return Err(LockError::Conflict(key.to_owned()));
        }

        debug!(key, ?expiration, "acquired lock");
        Ok(Lock::new(
            Arc::clone(&self.store),
            key.to_owned(),
            token,
            expiration,
            self.operation_timeout,
        ))
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
