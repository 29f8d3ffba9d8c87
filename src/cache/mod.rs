//! Cache Module
//!
//! Two-tier caching: a byte-bounded memory tier in front of a JSON file tier,
//! with TTL expiration and per-namespace metadata documents.

mod entry;
mod eviction;
mod file;
mod key;
mod memory;
mod metadata;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use eviction::EvictionQueue;
pub use file::FileTier;
pub use key::{derive_key, fingerprint, Shared, CIRCULAR_MARKER, FINGERPRINT_ERROR};
pub use memory::MemoryTier;
pub use metadata::{MetadataRecord, NamespaceMetadata};
pub use stats::{CacheStats, CacheStatus, MemoryStatus, NamespaceStatus};
pub use store::{CacheStore, GetOptions, SetOptions};

// == Public Constants ==
/// Default memory tier budget in bytes
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 100 * 1024 * 1024; // 100 MiB

/// Default entry TTL in milliseconds
pub const DEFAULT_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Eviction stops once the memory tier is at or below this share of its budget
pub const EVICTION_TARGET_PERCENT: u64 = 80;

/// Maximum allowed namespace length in bytes
pub const MAX_NAMESPACE_LENGTH: usize = 128;

/// Name of the per-namespace metadata document
pub const METADATA_FILE: &str = "metadata.json";
