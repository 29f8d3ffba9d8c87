//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with its payload and expiration data.
///
/// This is also the exact shape of a `<key>.json` file in the file tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Validity duration from `timestamp`, in milliseconds
    pub ttl: u64,
    /// Byte length of the serialized payload
    pub size: u64,
    /// Derived cache key
    pub key: String,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `key` - The derived cache key
    /// * `data` - The payload
    /// * `ttl_ms` - TTL in milliseconds
    pub fn new(key: impl Into<String>, data: Value, ttl_ms: u64) -> Self {
        Self::with_timestamp(key, data, ttl_ms, current_timestamp_ms())
    }

    /// Creates an entry with an explicit creation timestamp.
    pub fn with_timestamp(key: impl Into<String>, data: Value, ttl_ms: u64, timestamp: u64) -> Self {
        let size = payload_size(&data);
        Self {
            data,
            timestamp,
            ttl: ttl_ms,
            size,
            key: key.into(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at the given instant.
    ///
    /// Boundary condition: the entry is still valid at exactly
    /// `timestamp + ttl` and expired one millisecond later.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        is_expired(self.timestamp, self.ttl, now_ms)
    }

    /// Checks if the entry has expired against the system clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Expiration rule shared by entries and metadata records.
pub(crate) fn is_expired(timestamp: u64, ttl: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(timestamp) > ttl
}

/// Byte length of the compact JSON form of a payload.
pub(crate) fn payload_size(data: &Value) -> u64 {
    serde_json::to_vec(data).map(|b| b.len() as u64).unwrap_or(0)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
