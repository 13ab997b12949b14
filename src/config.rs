//! Configuration Module
//!
//! Handles loading the demo server and cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_SEGMENTS};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold, None = unbounded
    pub max_entries: Option<usize>,
    /// Expire entries not read for this many seconds
    pub expire_after_access: Option<u64>,
    /// Expire entries written more than this many seconds ago
    pub expire_after_write: Option<u64>,
    /// Number of cache map segments
    pub segments: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background refresh task interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries or `unbounded` (default: 1000)
    /// - `EXPIRE_AFTER_ACCESS` - Idle expiry in seconds or `off` (default: off)
    /// - `EXPIRE_AFTER_WRITE` - Write expiry in seconds or `off` (default: 300)
    /// - `CACHE_SEGMENTS` - Map segment count, a power of two (default: 16)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Refresh frequency in seconds (default: 1)
    ///
    /// Values are not range-checked here; the cache rejects invalid ones
    /// when it is constructed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_optional_var("MAX_ENTRIES", "unbounded", defaults.max_entries),
            expire_after_access: parse_optional_var(
                "EXPIRE_AFTER_ACCESS",
                "off",
                defaults.expire_after_access,
            ),
            expire_after_write: parse_optional_var(
                "EXPIRE_AFTER_WRITE",
                "off",
                defaults.expire_after_write,
            ),
            segments: parse_var("CACHE_SEGMENTS").unwrap_or(defaults.segments),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Builds the cache settings described by this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.max_entries,
            expire_after_access: self.expire_after_access.map(Duration::from_secs),
            expire_after_write: self.expire_after_write.map(Duration::from_secs),
            segments: self.segments,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Like `parse_var`, but `disabled` (case-insensitive) maps to None.
fn parse_optional_var<T: std::str::FromStr>(
    name: &str,
    disabled: &str,
    default: Option<T>,
) -> Option<T> {
    match env::var(name) {
        Ok(v) if v.eq_ignore_ascii_case(disabled) => None,
        Ok(v) => v.parse().ok().or(default),
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            expire_after_access: None,
            expire_after_write: Some(300),
            segments: DEFAULT_SEGMENTS,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
