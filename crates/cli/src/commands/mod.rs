pub mod acquire;
pub mod run;

use std::time::Duration;

use keylock::{Lock, LockError};

use crate::OutputFormat;

/// `sysexits.h` codes for lock outcomes.
const EX_USAGE: u8 = 64;
const EX_UNAVAILABLE: u8 = 69;
const EX_TEMPFAIL: u8 = 75;

/// Map a lock failure to a process exit status.
pub fn exit_status(err: &LockError) -> u8 {
    match err {
        LockError::Conflict(_) => EX_TEMPFAIL,
        LockError::Unavailable(_) => EX_UNAVAILABLE,
        LockError::InvalidRequest(_) => EX_USAGE,
        LockError::NotHeld(_) => 1,
    }
}

/// Report a lock failure on stderr and return its exit status.
pub fn report(err: &LockError) -> u8 {
    eprintln!("keylock: {err}");
    exit_status(err)
}

pub fn print_lock(lock: &Lock, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "key": lock.key(),
                "token": lock.token(),
                "expiration_ms": millis(lock.expiration()),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Key:        {}", lock.key());
            println!("Token:      {}", lock.token());
            println!("Expiration: {}ms", millis(lock.expiration()));
        }
    }
    Ok(())
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
