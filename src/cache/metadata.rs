//! Cache Metadata Module
//!
//! Per-namespace index of entry records, persisted as one `metadata.json`
//! document so reporting never has to open entry files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::entry::is_expired;

// == Metadata Record ==
/// Bookkeeping for one entry of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Derived cache key
    pub key: String,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// TTL in milliseconds
    pub ttl: u64,
    /// Byte length of the entry file
    pub size: u64,
    /// Content hash of the payload
    pub fingerprint: String,
    /// Last read through the file tier (Unix milliseconds)
    pub accessed: u64,
}

impl MetadataRecord {
    /// Same rule as [`CacheEntry::is_expired_at`](crate::cache::CacheEntry::is_expired_at).
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        is_expired(self.timestamp, self.ttl, now_ms)
    }
}

/// All records of one namespace, keyed by cache key.
pub type NamespaceMetadata = BTreeMap<String, MetadataRecord>;

/// Splits a namespace's records into `(expired, valid)` at `now_ms`.
pub(crate) fn partition_expired(
    metadata: NamespaceMetadata,
    now_ms: u64,
) -> (NamespaceMetadata, NamespaceMetadata) {
    metadata
        .into_iter()
        .partition(|(_, record)| record.is_expired_at(now_ms))
}
