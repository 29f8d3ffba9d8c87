//! Cache Statistics Module
//!
//! Hit/miss counters and the aggregate status report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::metadata::NamespaceMetadata;

// == Cache Stats ==
/// Counters accumulated since the cache was opened.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered by the memory tier
    pub memory_hits: u64,
    /// Lookups answered by the file tier
    pub file_hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Memory tier entries dropped to stay within budget
    pub evictions: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses) over both tiers, or 0.0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.file_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_file_hit(&mut self) {
        self.file_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }
}

// == Status Report ==
/// Memory tier occupancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    /// Resident entries
    pub entries: usize,
    /// Bytes in use
    pub size: u64,
    /// Byte budget
    pub max_size: u64,
}

/// File tier summary of one namespace, derived from its metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStatus {
    pub total_entries: usize,
    pub valid_entries: usize,
    /// Sum of recorded file sizes in bytes
    pub total_size: u64,
    /// Earliest entry timestamp (Unix milliseconds)
    pub oldest_entry: Option<u64>,
    /// Latest entry timestamp (Unix milliseconds)
    pub newest_entry: Option<u64>,
}

impl NamespaceStatus {
    /// Summarizes a metadata document as of `now_ms`.
    pub fn from_metadata(metadata: &NamespaceMetadata, now_ms: u64) -> Self {
        let records = metadata.values();
        Self {
            total_entries: metadata.len(),
            valid_entries: metadata
                .values()
                .filter(|record| !record.is_expired_at(now_ms))
                .count(),
            total_size: metadata.values().map(|record| record.size).sum(),
            oldest_entry: records.clone().map(|record| record.timestamp).min(),
            newest_entry: records.map(|record| record.timestamp).max(),
        }
    }
}

/// Aggregate report returned by [`CacheStore::status`](crate::cache::CacheStore::status).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub memory_cache: MemoryStatus,
    pub namespaces: BTreeMap<String, NamespaceStatus>,
    pub stats: CacheStats,
}
