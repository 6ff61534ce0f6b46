use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use keylock::{LockError, LockManager};
use tokio::process::Command;
use tracing::{info, warn};

/// Exit status after stopping the child on Ctrl-C (128 + SIGINT).
const EX_INTERRUPTED: u8 = 130;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Lock key.
    #[arg(long)]
    pub key: String,
    /// Lock TTL in milliseconds. Should exceed the command's running time.
    #[arg(long)]
    pub ttl_ms: Option<u64>,
    /// Command and arguments to run while holding the lock.
    #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
    pub command: Vec<String>,
}

pub async fn run(
    manager: &LockManager,
    args: &RunArgs,
    default_ttl: Duration,
) -> anyhow::Result<ExitCode> {
    let interrupt = async {
        // Without a signal handler, only the child's exit ends the wait.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let code = run_until(manager, args, default_ttl, interrupt).await?;
    Ok(ExitCode::from(code))
}

/// Acquire, run the child until it exits or `interrupt` fires, then release.
///
/// The lock is released on every path once acquired: normal exit, failed
/// exit, spawn failure and interruption.
async fn run_until(
    manager: &LockManager,
    args: &RunArgs,
    default_ttl: Duration,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<u8> {
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("no command given"))?;
    let ttl = args.ttl_ms.map_or(default_ttl, Duration::from_millis);
    let lock = match manager.acquire(&args.key, ttl).await {
        Ok(lock) => lock,
        Err(e) => return Ok(super::report(&e)),
    };
    info!(key = %lock.key(), token = %lock.token(), "lock acquired, running command");

    let outcome = supervise(program, rest, interrupt).await;

    match lock.release().await {
        Ok(()) => info!(key = %lock.key(), "lock released"),
        Err(LockError::NotHeld(_)) => {
            warn!(key = %lock.key(), "lock expired before the command finished");
        }
        Err(e) => warn!(key = %lock.key(), error = %e, "failed to release lock"),
    }

    outcome.map_err(|e| anyhow::anyhow!("failed to run {program}: {e}"))
}

async fn supervise(
    program: &str,
    args: &[String],
    interrupt: impl Future<Output = ()>,
) -> std::io::Result<u8> {
    let mut child = Command::new(program).args(args).kill_on_drop(true).spawn()?;

    tokio::select! {
        status = child.wait() => Ok(child_exit_code(status?.code())),
        () = interrupt => {
            warn!(program, "interrupted, stopping command");
            child.kill().await?;
            Ok(EX_INTERRUPTED)
        }
    }
}

/// Exit code to propagate for a finished child; signals map to 1.
fn child_exit_code(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keylock_memory::MemoryLockStore;

    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    fn run_args(key: &str, command: &[&str]) -> RunArgs {
        RunArgs {
            key: key.to_owned(),
            ttl_ms: None,
            command: command.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    fn manager_over(store: &MemoryLockStore) -> LockManager {
        LockManager::new(Arc::new(store.clone()))
    }

    #[test]
    fn child_exit_code_passthrough() {
        assert_eq!(child_exit_code(Some(0)), 0);
        assert_eq!(child_exit_code(Some(3)), 3);
        assert_eq!(child_exit_code(None), 1);
        assert_eq!(child_exit_code(Some(-1)), 1);
    }

    #[tokio::test]
    async fn successful_command_releases_lock() {
        let store = MemoryLockStore::new();
        let manager = manager_over(&store);

        let code = run_until(&manager, &run_args("job", &["true"]), TTL, std::future::pending())
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(store.token("job").is_none());
        manager.acquire("job", TTL).await.expect("key should be free");
    }

    #[tokio::test]
    async fn failing_command_releases_lock_and_propagates_code() {
        let store = MemoryLockStore::new();
        let manager = manager_over(&store);

        let code = run_until(&manager, &run_args("job", &["false"]), TTL, std::future::pending())
            .await
            .unwrap();

        assert_eq!(code, 1);
        assert!(store.token("job").is_none());
        manager.acquire("job", TTL).await.expect("key should be free");
    }

    #[tokio::test]
    async fn missing_program_errors_and_releases_lock() {
        let store = MemoryLockStore::new();
        let manager = manager_over(&store);

        let result = run_until(
            &manager,
            &run_args("job", &["keylock-no-such-program-7f3a"]),
            TTL,
            std::future::pending(),
        )
        .await;

        assert!(result.is_err());
        assert!(store.token("job").is_none());
        manager.acquire("job", TTL).await.expect("key should be free");
    }

    #[tokio::test]
    async fn interrupted_command_is_stopped_and_lock_released() {
        let store = MemoryLockStore::new();
        let manager = manager_over(&store);

        let code = run_until(
            &manager,
            &run_args("job", &["sleep", "30"]),
            TTL,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert_eq!(code, EX_INTERRUPTED);
        assert!(store.token("job").is_none());
    }

    #[tokio::test]
    async fn held_key_reports_conflict_without_running() {
        let store = MemoryLockStore::new();
        let manager = manager_over(&store);
        let _held = manager.acquire("job", TTL).await.unwrap();

        let code = run_until(&manager, &run_args("job", &["true"]), TTL, std::future::pending())
            .await
            .unwrap();

        assert_eq!(code, 75);
    }
}
