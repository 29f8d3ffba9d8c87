//! Memory Tier Module
//!
//! Key to entry map bounded by a soft byte budget. Crossing the budget evicts
//! oldest entries until usage drops to [`EVICTION_TARGET_PERCENT`] of it.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::key::key_in_namespace;
use crate::cache::{CacheEntry, EvictionQueue, EVICTION_TARGET_PERCENT};

// == Memory Tier ==
/// Volatile tier of the cache.
#[derive(Debug)]
pub struct MemoryTier {
    /// Resident entries
    entries: HashMap<String, CacheEntry>,
    /// Oldest-first eviction order
    queue: EvictionQueue,
    /// Sum of `size` over resident entries
    current_size: u64,
    /// Soft byte budget
    max_size: u64,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty tier with the given byte budget.
    pub fn new(max_size: u64) -> Self {
        Self {
            entries: HashMap::new(),
            queue: EvictionQueue::new(),
            current_size: 0,
            max_size,
        }
    }

    // == Lookup ==
    pub fn lookup(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Adds or overwrites an entry.
    ///
    /// Returns the number of entries evicted to get back under budget. The
    /// inserted entry itself may be evicted if it is the oldest resident.
    pub fn insert(&mut self, entry: CacheEntry) -> usize {
        let key = entry.key.clone();
        if let Some(previous) = self.entries.remove(&key) {
            self.current_size = self.current_size.saturating_sub(previous.size);
        }

        self.current_size += entry.size;
        self.queue.track(&key, entry.timestamp);
        self.entries.insert(key, entry);

        if self.current_size > self.max_size {
            self.evict()
        } else {
            0
        }
    }

    // == Evict ==
    /// Drops oldest-timestamp entries until usage is at or below the eviction
    /// target, or the tier is empty. Returns the number of entries removed.
    pub fn evict(&mut self) -> usize {
        let target = self.target_size();
        let mut evicted = 0;

        while self.current_size > target {
            let Some(key) = self.queue.pop_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.current_size = self.current_size.saturating_sub(entry.size);
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(
                "Memory tier evicted {} entries, {} of {} bytes in use",
                evicted, self.current_size, self.max_size
            );
        }
        evicted
    }

    // == Remove ==
    /// Removes one entry, returning it if it was resident.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.queue.remove(key);
        self.current_size = self.current_size.saturating_sub(entry.size);
        Some(entry)
    }

    // == Remove Namespace ==
    /// Removes every entry whose key was derived under `namespace`.
    pub fn remove_namespace(&mut self, namespace: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key_in_namespace(key, namespace))
            .cloned()
            .collect();

        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    fn target_size(&self) -> u64 {
        (u128::from(self.max_size) * u128::from(EVICTION_TARGET_PERCENT) / 100) as u64
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}
