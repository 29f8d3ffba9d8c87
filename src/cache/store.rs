//! Cache Store Module
//!
//! Lifecycle operations over the memory and file tiers. A `CacheStore` is
//! opened once at startup and shared (typically as `Arc<CacheStore>`) with
//! every collaborator that caches.
//!
//! None of the public operations fail: I/O and parse problems are logged and
//! the call behaves as if the entry were absent.

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::metadata::partition_expired;
use crate::cache::{
    current_timestamp_ms, derive_key, CacheEntry, CacheStats, CacheStatus, FileTier, MemoryStatus,
    MemoryTier, NamespaceStatus,
};
use crate::config::CacheConfig;
use crate::error::Result;

/// Options for [`CacheStore::get_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Return entries whose TTL has elapsed instead of discarding them
    pub accept_expired: bool,
}

/// Options for [`CacheStore::set_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// TTL in milliseconds, the store default when None
    pub ttl: Option<u64>,
}

/// Memory tier plus counters, guarded together.
#[derive(Debug)]
struct MemoryState {
    tier: MemoryTier,
    stats: CacheStats,
}

// == Cache Store ==
/// Two-tier cache context.
#[derive(Debug)]
pub struct CacheStore {
    memory: RwLock<MemoryState>,
    files: FileTier,
    namespaces: Vec<String>,
    default_ttl: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Opens the cache: creates the root and the configured namespace
    /// directories if they are missing.
    pub async fn open(config: CacheConfig) -> Result<Self> {
        let files = FileTier::new(config.cache_dir);
        files.provision(&config.namespaces).await?;
        info!(
            "Cache opened at {} ({} byte memory budget)",
            files.root().display(),
            config.max_memory_bytes
        );

        Ok(Self {
            memory: RwLock::new(MemoryState {
                tier: MemoryTier::new(config.max_memory_bytes),
                stats: CacheStats::new(),
            }),
            files,
            namespaces: config.namespaces,
            default_ttl: config.default_ttl_ms,
        })
    }

    pub fn file_tier(&self) -> &FileTier {
        &self.files
    }

    // == Get ==
    /// Returns the cached value for `identifier`, or None when absent or expired.
    pub async fn get<T: DeserializeOwned>(&self, namespace: &str, identifier: &str) -> Option<T> {
        self.get_with(namespace, identifier, GetOptions::default())
            .await
    }

    /// Like [`get`](Self::get), with options.
    ///
    /// Checks the memory tier, then the file tier. File hits are promoted
    /// into memory and their `accessed` time is recorded. Unless
    /// `accept_expired` is set, a stale memory entry is dropped and a stale
    /// file is reported as a miss; the file itself is left for
    /// [`cleanup`](Self::cleanup) or the next `set` to replace.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        namespace: &str,
        identifier: &str,
        options: GetOptions,
    ) -> Option<T> {
        if let Err(e) = FileTier::validate_namespace(namespace) {
            warn!("Cache lookup skipped: {}", e);
            return None;
        }
        let key = derive_key(namespace, identifier);
        let now = current_timestamp_ms();

        // Memory tier
        let memory_hit = {
            let mut guard = self.memory.write().await;
            let memory = &mut *guard;
            match memory.tier.lookup(&key) {
                Some(entry) if options.accept_expired || !entry.is_expired_at(now) => {
                    let data = entry.data.clone();
                    memory.stats.record_memory_hit();
                    Some(data)
                }
                Some(_) => {
                    memory.tier.remove(&key);
                    None
                }
                None => None,
            }
        };
        if let Some(data) = memory_hit {
            debug!("Memory hit for {}", key);
            return decode(&key, data);
        }

        // File tier
        let Some(entry) = self.files.read(namespace, &key).await else {
            self.memory.write().await.stats.record_miss();
            debug!("Cache miss for {}", key);
            return None;
        };

        // Stale files stay on disk for `accept_expired` readers until swept.
        if entry.is_expired_at(now) && !options.accept_expired {
            self.memory.write().await.stats.record_miss();
            debug!("Expired entry {} skipped", key);
            return None;
        }

        let data = entry.data.clone();
        {
            let mut memory = self.memory.write().await;
            let evicted = memory.tier.insert(entry);
            memory.stats.record_evictions(evicted);
            memory.stats.record_file_hit();
        }
        if let Err(e) = self.files.touch(namespace, &key, now).await {
            warn!("Failed to record access for {}: {}", key, e);
        }
        debug!("File hit for {}, promoted to memory", key);
        decode(&key, data)
    }

    // == Set ==
    /// Caches `data` under `identifier` with the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, namespace: &str, identifier: &str, data: &T) {
        self.set_with(namespace, identifier, data, SetOptions::default())
            .await
    }

    /// Caches `data` with options.
    ///
    /// Writes the file tier (and its metadata record) and then the memory
    /// tier. Failures are logged; the caller is never interrupted.
    pub async fn set_with<T: Serialize + ?Sized>(
        &self,
        namespace: &str,
        identifier: &str,
        data: &T,
        options: SetOptions,
    ) {
        if let Err(e) = FileTier::validate_namespace(namespace) {
            error!("Cache write skipped: {}", e);
            return;
        }
        let key = derive_key(namespace, identifier);

        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to serialize payload for {}: {}", key, e);
                return;
            }
        };
        let entry = CacheEntry::new(key, value, options.ttl.unwrap_or(self.default_ttl));

        if let Err(e) = self.files.write(namespace, &entry).await {
            error!("Failed to write cache entry {}: {}", entry.key, e);
        }

        let key = entry.key.clone();
        let mut memory = self.memory.write().await;
        let evicted = memory.tier.insert(entry);
        memory.stats.record_evictions(evicted);
        debug!("Cached {} ({} evicted)", key, evicted);
    }

    // == Invalidate ==
    /// Removes one entry, or with no identifier the whole namespace, from
    /// both tiers.
    pub async fn invalidate(&self, namespace: &str, identifier: Option<&str>) {
        if let Err(e) = FileTier::validate_namespace(namespace) {
            error!("Invalidation skipped: {}", e);
            return;
        }

        match identifier {
            Some(identifier) => {
                let key = derive_key(namespace, identifier);
                self.memory.write().await.tier.remove(&key);
                if let Err(e) = self.files.delete(namespace, &key).await {
                    error!("Failed to delete cache entry {}: {}", key, e);
                }
                info!("Invalidated {} in '{}'", identifier, namespace);
            }
            None => {
                let purged = self.memory.write().await.tier.remove_namespace(namespace);
                if let Err(e) = self.files.delete_namespace(namespace).await {
                    error!("Failed to clear namespace '{}': {}", namespace, e);
                }
                info!(
                    "Invalidated namespace '{}' ({} entries dropped from memory)",
                    namespace, purged
                );
            }
        }
    }

    // == Cleanup ==
    /// Sweeps every known namespace, deleting files and metadata records of
    /// expired entries. Returns the number of entries swept.
    ///
    /// A record is only dropped once its file is gone.
    ///
    /// The memory tier is left alone; stale entries there are dropped on
    /// their next lookup.
    pub async fn cleanup(&self) -> usize {
        let now = current_timestamp_ms();
        let mut swept = 0;

        for namespace in self.known_namespaces().await {
            let metadata = self.files.load_metadata(&namespace).await;
            let (expired, mut kept) = partition_expired(metadata, now);
            if expired.is_empty() {
                continue;
            }

            let mut removed = 0;
            for (key, record) in expired {
                match self.files.remove_entry_file(&namespace, &key).await {
                    Ok(_) => removed += 1,
                    Err(e) => {
                        // keep the record so the next sweep retries the file
                        warn!("Failed to remove expired entry {}: {}", key, e);
                        kept.insert(key, record);
                    }
                }
            }
            if removed == 0 {
                continue;
            }
            if let Err(e) = self.files.save_metadata(&namespace, &kept).await {
                error!("Failed to rewrite metadata for '{}': {}", namespace, e);
                continue;
            }

            info!("Swept {} expired entries from '{}'", removed, namespace);
            swept += removed;
        }
        swept
    }

    // == Status ==
    /// Reports memory occupancy and per-namespace file tier summaries.
    ///
    /// File tier figures come from the metadata documents alone.
    pub async fn status(&self, namespace: Option<&str>) -> CacheStatus {
        let (memory_cache, stats) = {
            let memory = self.memory.read().await;
            (
                MemoryStatus {
                    entries: memory.tier.len(),
                    size: memory.tier.current_size(),
                    max_size: memory.tier.max_size(),
                },
                memory.stats.clone(),
            )
        };

        let scope = match namespace {
            Some(namespace) => vec![namespace.to_string()],
            None => self.known_namespaces().await,
        };

        let now = current_timestamp_ms();
        let mut namespaces = std::collections::BTreeMap::new();
        for namespace in scope {
            if FileTier::validate_namespace(&namespace).is_err() {
                continue;
            }
            let metadata = self.files.load_metadata(&namespace).await;
            namespaces.insert(namespace, NamespaceStatus::from_metadata(&metadata, now));
        }

        CacheStatus {
            memory_cache,
            namespaces,
            stats,
        }
    }

    /// Configured namespaces plus any namespace directories found on disk.
    async fn known_namespaces(&self) -> Vec<String> {
        let mut names = self.files.namespaces().await;
        names.extend(self.namespaces.iter().cloned());
        names.sort();
        names.dedup();
        names
    }
}

/// Converts a cached payload into the caller's type; mismatches are a miss.
fn decode<T: DeserializeOwned>(key: &str, data: serde_json::Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cached payload {} does not match requested type: {}", key, e);
            None
        }
    }
}
