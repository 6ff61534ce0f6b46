use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use keylock::LockManager;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct AcquireArgs {
    /// Lock key.
    #[arg(long)]
    pub key: String,
    /// Lock TTL in milliseconds. The lock is left to expire.
    #[arg(long)]
    pub ttl_ms: Option<u64>,
}

pub async fn run(
    manager: &LockManager,
    args: &AcquireArgs,
    default_ttl: Duration,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let ttl = args.ttl_ms.map_or(default_ttl, Duration::from_millis);
    match manager.acquire(&args.key, ttl).await {
        Ok(lock) => {
            super::print_lock(&lock, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(ExitCode::from(super::report(&e))),
    }
}
