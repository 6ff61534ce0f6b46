//! Distributed mutual exclusion over a shared key-value store.
//!
//! A [`LockManager`] performs a single atomic "set if absent, with TTL"
//! against a [`LockStore`] and hands back a [`Lock`] carrying a freshly
//! minted ownership token. [`Lock::release`] deletes the key only if it
//! still holds that token, so a holder whose lock expired and was taken
//! over by someone else can never delete the new owner's entry.
//!
//! Store backends live in sibling crates (`keylock-redis`,
//! `keylock-memory`).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use keylock::{LockError, LockManager};
//! use keylock_redis::{RedisConfig, RedisLockStore};
//!
//! let store = RedisLockStore::new(&RedisConfig::default())?;
//! let manager = LockManager::new(Arc::new(store));
//!
//! match manager.acquire("invoices:rebuild", Duration::from_secs(30)).await {
//!     Ok(lock) => {
//!         // Critical section...
//!         lock.release().await?;
//!     }
//!     Err(LockError::Conflict(_)) => { /* someone else is on it */ }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod error;
pub mod lock;
pub mod manager;
pub mod store;
pub mod testing;
pub mod token;

pub use error::{LockError, StoreError};
pub use lock::Lock;
pub use manager::{LockManager, MAX_EXPIRATION};
pub use store::LockStore;
pub use token::{TokenGenerator, UuidTokens};
