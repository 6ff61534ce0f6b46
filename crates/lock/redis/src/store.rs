use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{RedisError, Script};
use tracing::debug;

use keylock::{LockStore, StoreError};

use crate::config::RedisConfig;
use crate::scripts;

/// Redis-backed implementation of [`LockStore`].
///
/// Each operation checks a connection out of the pool for exactly one
/// command; the pooled object returns it when dropped, on success and error
/// paths alike.
pub struct RedisLockStore {
    pool: Pool,
    prefix: String,
    release: Script,
}

impl RedisLockStore {
    /// Create a new `RedisLockStore` from the provided configuration.
    ///
    /// The pool connects lazily, so an unreachable server surfaces on the
    /// first lock operation rather than here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created
    /// (for example, a malformed URL).
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self::from_pool(pool, config.prefix.clone()))
    }

    /// Wrap an existing pool shared with other parts of the application.
    pub fn from_pool(pool: Pool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            release: Script::new(scripts::LOCK_RELEASE),
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Build the full Redis key for a lock.
    fn lock_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}:lock:{}", self.prefix, key)
        }
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// TTL in whole milliseconds, rounding any sub-millisecond remainder up so a
/// positive duration never becomes `PX 0`.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX)
}

fn store_error(err: &RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let redis_key = self.lock_key(key);
        let mut conn = self.conn().await?;

        // `SET NX` replies OK when it wrote the key and nil when it existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(&e))?;

        debug!(key = %redis_key, acquired = reply.is_some(), "SET NX PX");
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, token: &str) -> Result<bool, StoreError> {
        let redis_key = self.lock_key(key);
        let mut conn = self.conn().await?;

        // A nil reply is treated like 0: nothing was deleted.
        let deleted: Option<i64> = self
            .release
            .key(&redis_key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error(&e))?;

        debug!(key = %redis_key, ?deleted, "release script");
        Ok(deleted == Some(1))
    }
}

impl fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLockStore")
            .field("prefix", &self.prefix)
            .field("pool", &self.pool.status())
            .finish_non_exhaustive()
    }
}
