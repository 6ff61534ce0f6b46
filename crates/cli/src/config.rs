use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use keylock_redis::RedisConfig;

/// Default lock TTL when neither the command line nor the file sets one.
pub const DEFAULT_TTL_MS: u64 = 30_000;

/// Top-level `keylock.toml` configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeylockConfig {
    /// Redis connection settings.
    #[serde(default)]
    pub redis: RedisSection,
    /// Lock defaults.
    #[serde(default)]
    pub lock: LockSection,
}

/// `[redis]` section.
#[derive(Debug, Default, Deserialize)]
pub struct RedisSection {
    /// Connection URL. Defaults to `redis://127.0.0.1:6379`.
    pub url: Option<String>,
    /// Key prefix. Defaults to `"keylock"`.
    pub prefix: Option<String>,
    /// Maximum pooled connections.
    pub pool_size: Option<usize>,
    /// Timeout for checking a connection out of the pool, in milliseconds.
    pub connection_timeout_ms: Option<u64>,
}

/// `[lock]` section.
#[derive(Debug, Default, Deserialize)]
pub struct LockSection {
    /// TTL applied when `--ttl-ms` is not given.
    pub default_ttl_ms: Option<u64>,
    /// Deadline for each individual store call.
    pub operation_timeout_ms: Option<u64>,
}

impl KeylockConfig {
    /// Load configuration from a TOML file, or use defaults if the file does
    /// not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(toml::from_str("")?)
        }
    }

    /// Build the Redis store configuration, falling back to library defaults.
    pub fn redis_config(&self) -> RedisConfig {
        let defaults = RedisConfig::default();
        RedisConfig {
            url: self.redis.url.clone().unwrap_or(defaults.url),
            prefix: self.redis.prefix.clone().unwrap_or(defaults.prefix),
            pool_size: self.redis.pool_size.unwrap_or(defaults.pool_size),
            connection_timeout: self
                .redis
                .connection_timeout_ms
                .map_or(defaults.connection_timeout, Duration::from_millis),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.lock.default_ttl_ms.unwrap_or(DEFAULT_TTL_MS))
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.lock.operation_timeout_ms.map(Duration::from_millis)
    }
}
