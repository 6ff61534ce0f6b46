//! keylock CLI
//!
//! Acquire Redis-backed distributed locks from the shell, or run a command
//! while holding one.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keylock::LockManager;
use keylock_redis::RedisLockStore;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::KeylockConfig;

/// keylock: distributed locks over Redis.
#[derive(Parser, Debug)]
#[command(name = "keylock", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        env = "KEYLOCK_CONFIG",
        default_value = "keylock.toml",
        global = true
    )]
    config: PathBuf,

    /// Override the Redis URL.
    #[arg(long, env = "KEYLOCK_REDIS_URL", global = true)]
    url: Option<String>,

    /// Override the key prefix.
    #[arg(long, env = "KEYLOCK_PREFIX", global = true)]
    prefix: Option<String>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Acquire a lock once and print its token.
    Acquire(commands::acquire::AcquireArgs),
    /// Run a command while holding a lock.
    Run(commands::run::RunArgs),
}

fn build_manager(cli: &Cli, config: &KeylockConfig) -> anyhow::Result<LockManager> {
    let mut redis = config.redis_config();
    if let Some(url) = &cli.url {
        redis.url.clone_from(url);
    }
    if let Some(prefix) = &cli.prefix {
        redis.prefix.clone_from(prefix);
    }

    let store = RedisLockStore::new(&redis)?;
    let manager = LockManager::new(Arc::new(store));
    Ok(match config.operation_timeout() {
        Some(timeout) => manager.with_operation_timeout(timeout),
        None => manager,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = KeylockConfig::load(&cli.config)?;
    let manager = build_manager(&cli, &config)?;
    let default_ttl = config.default_ttl();

    match &cli.command {
        Command::Acquire(args) => {
            commands::acquire::run(&manager, args, default_ttl, &cli.format).await
        }
        Command::Run(args) => commands::run::run(&manager, args, default_ttl).await,
    }
}
