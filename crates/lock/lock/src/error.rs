use std::time::Duration;

use thiserror::Error;

/// Failures of the underlying store round-trip.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from acquiring or releasing a lock.
///
/// `Conflict` and `NotHeld` are expected outcomes under contention and
/// expiry; `Unavailable` means the store could not be reached or answered
/// with an error. None of them is retried internally.
#[derive(Debug, Error)]
pub enum LockError {
    /// The key is currently held by another owner.
    #[error("lock conflict: {0} is already held")]
    Conflict(String),

    /// The store no longer holds this handle's token for the key.
    #[error("lock not held: {0}")]
    NotHeld(String),

    #[error("store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    /// Rejected before contacting the store (empty key, zero expiration).
    #[error("invalid lock request: {0}")]
    InvalidRequest(String),
}

impl LockError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_held(&self) -> bool {
        matches!(self, Self::NotHeld(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_unavailable() {
        let err: LockError = StoreError::Connection("pool exhausted".into()).into();
        assert!(err.is_unavailable());
        assert!(!err.is_conflict());
        assert_eq!(
            err.to_string(),
            "store unavailable: connection error: pool exhausted"
        );
    }

    #[test]
    fn predicates_are_exclusive() {
        let conflict = LockError::Conflict("jobs".into());
        let not_held = LockError::NotHeld("jobs".into());
        assert!(conflict.is_conflict() && !conflict.is_not_held());
        assert!(not_held.is_not_held() && !not_held.is_unavailable());
    }

    #[test]
    fn timeout_message_includes_duration() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "operation timed out after 250ms");
    }
}
