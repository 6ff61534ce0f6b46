/// Lua script for releasing a lock.
///
/// KEYS\[1\] = lock key
/// ARGV\[1\] = owner token
///
/// Returns the number of deleted keys: 1 if the key held the token, 0 if it
/// was absent or held another token.
pub const LOCK_RELEASE: &str = include_str!("../lua/release.lua");
