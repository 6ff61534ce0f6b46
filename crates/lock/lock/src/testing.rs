//! Backend-agnostic conformance suite for [`LockStore`](crate::LockStore)
//! implementations, driven through a [`LockManager`].

use std::collections::HashSet;
use std::time::Duration;

use crate::error::LockError;
use crate::manager::LockManager;

const LONG_TTL: Duration = Duration::from_secs(10);
const SHORT_TTL: Duration = Duration::from_millis(200);
const PAST_SHORT_TTL: Duration = Duration::from_millis(400);

/// Run the full lock conformance test suite.
///
/// Call this from your backend's test module with a manager over a fresh
/// store. Two of the checks sleep past a 200ms TTL; run them under a paused
/// tokio clock where the backend's expiry follows tokio time.
///
/// # Errors
///
/// Returns an error if the store fails; protocol violations panic.
pub async fn run_lock_conformance_tests(manager: &LockManager) -> Result<(), LockError> {
    test_acquire_release_reacquire(manager).await?;
    test_acquire_conflict(manager).await?;
    test_release_is_idempotent(manager).await?;
    test_stolen_lock_release(manager).await?;
    test_expiration_without_release(manager).await?;
    test_key_isolation(manager).await?;
    test_token_uniqueness(manager).await?;
    test_concurrent_mutual_exclusion(manager).await?;
    Ok(())
}

async fn test_acquire_release_reacquire(manager: &LockManager) -> Result<(), LockError> {
    let lock = manager.acquire("conformance-1", LONG_TTL).await?;
    lock.release().await?;

    let again = manager.acquire("conformance-1", LONG_TTL).await?;
    again.release().await?;
    Ok(())
}

async fn test_acquire_conflict(manager: &LockManager) -> Result<(), LockError> {
    let held = manager.acquire("conformance-2", LONG_TTL).await?;

    let second = manager.acquire("conformance-2", LONG_TTL).await;
    assert!(
        matches!(second, Err(LockError::Conflict(_))),
        "second acquire should conflict while lock is held"
    );

    held.release().await?;
    Ok(())
}

async fn test_release_is_idempotent(manager: &LockManager) -> Result<(), LockError> {
    let lock = manager.acquire("conformance-3", LONG_TTL).await?;
    lock.release().await?;

    let again = lock.release().await;
    assert!(
        matches!(again, Err(LockError::NotHeld(_))),
        "second release should report not held"
    );
    Ok(())
}

async fn test_stolen_lock_release(manager: &LockManager) -> Result<(), LockError> {
    let stale = manager.acquire("conformance-4", SHORT_TTL).await?;
    tokio::time::sleep(PAST_SHORT_TTL).await;

    let current = manager.acquire("conformance-4", LONG_TTL).await?;
    assert_ne!(stale.token(), current.token());

    let released = stale.release().await;
    assert!(
        matches!(released, Err(LockError::NotHeld(_))),
        "expired holder must not release the new owner's lock"
    );

    let third = manager.acquire("conformance-4", LONG_TTL).await;
    assert!(
        matches!(third, Err(LockError::Conflict(_))),
        "new owner should still hold the lock"
    );

    current.release().await?;
    Ok(())
}

async fn test_expiration_without_release(manager: &LockManager) -> Result<(), LockError> {
    let _abandoned = manager.acquire("conformance-5", SHORT_TTL).await?;
    tokio::time::sleep(PAST_SHORT_TTL).await;

    let lock = manager.acquire("conformance-5", LONG_TTL).await?;
    lock.release().await?;
    Ok(())
}

async fn test_key_isolation(manager: &LockManager) -> Result<(), LockError> {
    let first = manager.acquire("conformance-6a", LONG_TTL).await?;
    let second = manager.acquire("conformance-6b", LONG_TTL).await?;

    first.release().await?;
    let still_held = manager.acquire("conformance-6b", LONG_TTL).await;
    assert!(
        matches!(still_held, Err(LockError::Conflict(_))),
        "releasing one key must not free another"
    );

    second.release().await?;
    Ok(())
}

async fn test_token_uniqueness(manager: &LockManager) -> Result<(), LockError> {
    let mut tokens = HashSet::new();
    for _ in 0..1000 {
        let lock = manager.acquire("conformance-7", LONG_TTL).await?;
        assert!(
            tokens.insert(lock.token().to_owned()),
            "token {} was issued twice",
            lock.token()
        );
        lock.release().await?;
    }
    Ok(())
}

async fn test_concurrent_mutual_exclusion(manager: &LockManager) -> Result<(), LockError> {
    let mut handles = Vec::new();
    for _ in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.acquire("conformance-8", LONG_TTL).await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.expect("acquire task should not panic") {
            Ok(lock) => winners.push(lock),
            Err(LockError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }
    assert_eq!(winners.len(), 1, "exactly one concurrent acquire should win");

    for lock in winners {
        lock.release().await?;
    }
    Ok(())
}
