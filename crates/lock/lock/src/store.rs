use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// The store primitives the lock protocol is built on.
///
/// Both operations must be atomic on the store side. Implementations own
/// their connection handling and must hand connections back on every exit
/// path.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key` to `token` with the given TTL only if `key` does not exist.
    ///
    /// Returns `true` if the key was set, `false` if it already existed.
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    /// Delete `key` only if its current value equals `token`.
    ///
    /// Returns `true` if a deletion happened.
    async fn delete_if_equals(&self, key: &str, token: &str) -> Result<bool, StoreError>;
}

/// Run a store operation, abandoning it once `limit` elapses.
///
/// An abandoned operation may or may not have been applied by the store.
pub(crate) async fn bounded<T>(
    limit: Option<Duration>,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| StoreError::Timeout(limit))?,
        None => op.await,
    }
}
