//! Redis lock store for `keylock`.
//!
//! Acquisition is a native `SET key token NX PX ms`; release runs a Lua
//! compare-and-delete through `EVALSHA` (loading the script on first use).
//! Connections come from a `deadpool-redis` pool.
//!
//! # Consistency
//!
//! | Deployment | Mutual Exclusion | Notes |
//! |------------|------------------|-------|
//! | Single instance | Strong | Full mutual exclusion guaranteed |
//! | Sentinel | Weak | Lock may be lost during failover |
//! | Cluster | Weak | Lock may be lost during failover |
//!
//! Replication is asynchronous: a lock written to a master that fails before
//! replicating is absent on the promoted replica, and a second client can
//! acquire it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keylock::LockManager;
//! use keylock_redis::{RedisConfig, RedisLockStore};
//!
//! let store = RedisLockStore::new(&RedisConfig::new("redis://localhost:6379"))?;
//! let manager = LockManager::new(Arc::new(store));
//! ```

mod config;
mod scripts;
mod store;

pub use config::RedisConfig;
pub use scripts::LOCK_RELEASE;
pub use store::RedisLockStore;
