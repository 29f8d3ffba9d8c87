//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Namespaces provisioned on disk when the cache is opened.
pub const KNOWN_NAMESPACES: [&str; 3] = ["study-plan-questions", "coding-problems", "companies"];

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory of the file tier
    pub cache_dir: PathBuf,
    /// Soft byte budget of the memory tier
    pub max_memory_bytes: u64,
    /// TTL in milliseconds applied by `set` when none is given
    pub default_ttl_ms: u64,
    /// Background cleanup interval in seconds
    pub cleanup_interval: u64,
    /// Namespaces whose directories are created at startup
    pub namespaces: Vec<String>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Root of the on-disk cache (default: `./cache`)
    /// - `CACHE_MAX_MEMORY_BYTES` - Memory tier budget (default: 100 MiB)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 24h)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_memory_bytes: env::var("CACHE_MAX_MEMORY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_memory_bytes),
            default_ttl_ms: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_ms),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
            namespaces: defaults.namespaces,
        }
    }

    /// Creates a default configuration rooted at `cache_dir`.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            max_memory_bytes: crate::cache::DEFAULT_MAX_MEMORY_BYTES,
            default_ttl_ms: crate::cache::DEFAULT_TTL_MS,
            cleanup_interval: 3600,
            namespaces: KNOWN_NAMESPACES.iter().map(|ns| ns.to_string()).collect(),
        }
    }
}
