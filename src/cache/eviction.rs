//! Eviction Queue Module
//!
//! Orders memory-tier keys by entry timestamp for oldest-first eviction.

use std::collections::{BTreeSet, HashMap};

// == Eviction Queue ==
/// Tracks resident keys ordered by `(timestamp, key)`.
///
/// The first element of the ordered set is the next eviction candidate.
/// Entries sharing a timestamp fall back to key order.
#[derive(Debug, Default)]
pub struct EvictionQueue {
    /// Keys ordered oldest first
    order: BTreeSet<(u64, String)>,
    /// Timestamp currently recorded for each key
    stamps: HashMap<String, u64>,
}

impl EvictionQueue {
    // == Constructor ==
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Records `key` with the given entry timestamp, replacing any prior position.
    pub fn track(&mut self, key: &str, timestamp: u64) {
        self.remove(key);
        self.order.insert((timestamp, key.to_string()));
        self.stamps.insert(key.to_string(), timestamp);
    }

    // == Remove ==
    /// Removes a key from the queue.
    pub fn remove(&mut self, key: &str) {
        if let Some(timestamp) = self.stamps.remove(key) {
            self.order.remove(&(timestamp, key.to_string()));
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the key with the oldest timestamp.
    ///
    /// Returns None if the queue is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the oldest key without removing it.
    #[cfg(test)]
    fn peek_oldest(&self) -> Option<&str> {
        self.order.first().map(|(_, key)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }
}
