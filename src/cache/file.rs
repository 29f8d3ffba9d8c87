//! File Tier Module
//!
//! Durable tier of the cache. Layout under the cache root:
//!
//! ```text
//! <root>/
//!   <namespace>/
//!     metadata.json   # { key: MetadataRecord }
//!     <key>.json      # CacheEntry
//! ```
//!
//! Documents are written to a `.tmp` sibling and renamed into place so a
//! crash mid-write never leaves a truncated file behind.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::key::fingerprint;
use crate::cache::metadata::{MetadataRecord, NamespaceMetadata};
use crate::cache::{CacheEntry, MAX_NAMESPACE_LENGTH, METADATA_FILE};
use crate::error::{CacheError, Result};

// == File Tier ==
#[derive(Debug, Clone)]
pub struct FileTier {
    /// Cache root directory
    root: PathBuf,
}

impl FileTier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // == Namespace Validation ==
    /// Rejects namespaces that cannot be used as a single directory name.
    pub fn validate_namespace(namespace: &str) -> Result<()> {
        let invalid = namespace.is_empty()
            || namespace.len() > MAX_NAMESPACE_LENGTH
            || namespace == "."
            || namespace == ".."
            || namespace.contains(['/', '\\', '\0']);
        if invalid {
            return Err(CacheError::InvalidNamespace(namespace.to_string()));
        }
        Ok(())
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{}.json", key))
    }

    fn metadata_path(&self, namespace: &str) -> PathBuf {
        self.namespace_dir(namespace).join(METADATA_FILE)
    }

    // == Provision ==
    /// Creates the root and one directory per namespace. Idempotent.
    pub async fn provision<I, S>(&self, namespaces: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::io(&self.root, e))?;
        for namespace in namespaces {
            let namespace = namespace.as_ref();
            Self::validate_namespace(namespace)?;
            let dir = self.namespace_dir(namespace);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    // == Read ==
    /// Reads an entry file.
    ///
    /// Missing files are a silent miss; unparsable files are logged and
    /// treated as a miss.
    pub async fn read(&self, namespace: &str, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(namespace, key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                let err = CacheError::Corrupt {
                    path,
                    reason: e.to_string(),
                };
                warn!("Treating as miss: {}", err);
                None
            }
        }
    }

    // == Write ==
    /// Writes an entry file, then upserts its metadata record.
    ///
    /// The record's `size` is the byte length of the file written and its
    /// `fingerprint` is computed from the entry payload.
    pub async fn write(&self, namespace: &str, entry: &CacheEntry) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;

        let json = serde_json::to_vec_pretty(entry)?;
        write_atomic(&self.entry_path(namespace, &entry.key), &json).await?;

        let record = MetadataRecord {
            key: entry.key.clone(),
            timestamp: entry.timestamp,
            ttl: entry.ttl,
            size: json.len() as u64,
            fingerprint: fingerprint(&entry.data),
            accessed: entry.timestamp,
        };

        let mut metadata = self.load_metadata(namespace).await;
        metadata.insert(entry.key.clone(), record);
        self.save_metadata(namespace, &metadata).await
    }

    // == Touch ==
    /// Sets the `accessed` time of one record and persists the document.
    ///
    /// Does nothing if the namespace has no record for `key`.
    pub async fn touch(&self, namespace: &str, key: &str, now_ms: u64) -> Result<()> {
        let mut metadata = self.load_metadata(namespace).await;
        match metadata.get_mut(key) {
            Some(record) => record.accessed = now_ms,
            None => return Ok(()),
        }
        self.save_metadata(namespace, &metadata).await
    }

    // == Delete ==
    /// Removes an entry file and its metadata record.
    ///
    /// Returns whether a file was removed.
    pub async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let removed = self.remove_entry_file(namespace, key).await?;

        let mut metadata = self.load_metadata(namespace).await;
        if metadata.remove(key).is_some() {
            self.save_metadata(namespace, &metadata).await?;
        }
        Ok(removed)
    }

    /// Removes an entry file without touching metadata.
    pub(crate) async fn remove_entry_file(&self, namespace: &str, key: &str) -> Result<bool> {
        let path = self.entry_path(namespace, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    // == Delete Namespace ==
    /// Removes the namespace directory recursively and recreates it empty.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(&dir, e)),
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))
    }

    // == Metadata ==
    /// Loads a namespace's metadata document.
    ///
    /// A missing document is an empty namespace. An unparsable one is logged
    /// and also treated as empty; the next write rebuilds it.
    pub async fn load_metadata(&self, namespace: &str) -> NamespaceMetadata {
        let path = self.metadata_path(namespace);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return NamespaceMetadata::new();
            }
            Err(e) => {
                warn!("Failed to read metadata {}: {}", path.display(), e);
                return NamespaceMetadata::new();
            }
        };

        match serde_json::from_slice(&content) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "Corrupt metadata {}, starting namespace index over: {}",
                    path.display(),
                    e
                );
                NamespaceMetadata::new()
            }
        }
    }

    /// Rewrites a namespace's metadata document in full.
    pub async fn save_metadata(&self, namespace: &str, metadata: &NamespaceMetadata) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;

        let json = serde_json::to_vec_pretty(metadata)?;
        write_atomic(&self.metadata_path(namespace), &json).await?;
        debug!("Saved metadata for '{}' ({} records)", namespace, metadata.len());
        Ok(())
    }

    // == Namespaces ==
    /// Names of the namespace directories currently under the root.
    pub async fn namespaces(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to list cache root {}: {}", self.root.display(), e);
                }
                return names;
            }
        };

        while let Ok(Some(item)) = dir.next_entry().await {
            let is_dir = item.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(name) = item.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }
}

/// Writes `bytes` to a `.tmp` sibling of `path` and renames it into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, bytes)
        .await
        .map_err(|e| CacheError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| CacheError::io(path, e))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_tier() -> (FileTier, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let tier = FileTier::new(temp_dir.path().to_path_buf());
        (tier, temp_dir)
    }

    #[test]
    fn test_validate_namespace() {
        assert!(FileTier::validate_namespace("coding-problems").is_ok());
        assert!(FileTier::validate_namespace("").is_err());
        assert!(FileTier::validate_namespace("..").is_err());
        assert!(FileTier::validate_namespace("a/b").is_err());
        assert!(FileTier::validate_namespace(&"n".repeat(MAX_NAMESPACE_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let (tier, temp_dir) = create_test_tier();

        tier.provision(["one", "two"]).await.unwrap();
        tier.provision(["one", "two"]).await.unwrap();

        assert!(temp_dir.path().join("one").is_dir());
        assert!(temp_dir.path().join("two").is_dir());
        assert_eq!(tier.namespaces().await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (tier, temp_dir) = create_test_tier();
        let entry = CacheEntry::new("demo_abc", json!({"value": 42}), 1_000);

        tier.write("demo", &entry).await.unwrap();

        assert!(temp_dir.path().join("demo").join("demo_abc.json").exists());
        assert_eq!(tier.read("demo", "demo_abc").await, Some(entry));
    }

    #[tokio::test]
    async fn test_write_records_metadata() {
        let (tier, temp_dir) = create_test_tier();
        let entry = CacheEntry::new("demo_abc", json!([1, 2, 3]), 5_000);

        tier.write("demo", &entry).await.unwrap();

        let metadata = tier.load_metadata("demo").await;
        let record = metadata.get("demo_abc").expect("record should exist");
        let file_len = std::fs::metadata(temp_dir.path().join("demo").join("demo_abc.json"))
            .unwrap()
            .len();

        assert_eq!(record.timestamp, entry.timestamp);
        assert_eq!(record.ttl, 5_000);
        assert_eq!(record.size, file_len);
        assert_eq!(record.fingerprint, fingerprint(&json!([1, 2, 3])));
        assert_eq!(record.accessed, entry.timestamp);
        assert!(!temp_dir.path().join("demo").join("metadata.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let (tier, _temp_dir) = create_test_tier();
        assert!(tier.read("demo", "demo_nothing").await.is_none());
    }

    #[tokio::test]
    async fn test_read_corrupt_is_none() {
        let (tier, temp_dir) = create_test_tier();
        let dir = temp_dir.path().join("demo");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("demo_bad.json"), "{ not json").unwrap();

        assert!(tier.read("demo", "demo_bad").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_metadata_loads_empty() {
        let (tier, temp_dir) = create_test_tier();
        let dir = temp_dir.path().join("demo");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(METADATA_FILE), "garbage").unwrap();

        assert!(tier.load_metadata("demo").await.is_empty());

        // next write heals the document
        tier.write("demo", &CacheEntry::new("demo_k", json!(1), 1_000))
            .await
            .unwrap();
        assert_eq!(tier.load_metadata("demo").await.len(), 1);
    }

    #[tokio::test]
    async fn test_touch_updates_accessed() {
        let (tier, _temp_dir) = create_test_tier();
        let entry = CacheEntry::with_timestamp("demo_k", json!(1), 1_000, 100);
        tier.write("demo", &entry).await.unwrap();

        tier.touch("demo", "demo_k", 999).await.unwrap();
        tier.touch("demo", "demo_missing", 999).await.unwrap();

        let metadata = tier.load_metadata("demo").await;
        assert_eq!(metadata["demo_k"].accessed, 999);
        assert_eq!(metadata.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_record() {
        let (tier, _temp_dir) = create_test_tier();
        tier.write("demo", &CacheEntry::new("demo_a", json!(1), 1_000))
            .await
            .unwrap();
        tier.write("demo", &CacheEntry::new("demo_b", json!(2), 1_000))
            .await
            .unwrap();

        assert!(tier.delete("demo", "demo_a").await.unwrap());
        assert!(!tier.delete("demo", "demo_a").await.unwrap());

        assert!(tier.read("demo", "demo_a").await.is_none());
        let metadata = tier.load_metadata("demo").await;
        assert!(!metadata.contains_key("demo_a"));
        assert!(metadata.contains_key("demo_b"));
    }

    #[tokio::test]
    async fn test_delete_namespace_recreates_empty_dir() {
        let (tier, temp_dir) = create_test_tier();
        tier.write("demo", &CacheEntry::new("demo_a", json!(1), 1_000))
            .await
            .unwrap();

        tier.delete_namespace("demo").await.unwrap();

        let dir = temp_dir.path().join("demo");
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        assert!(tier.load_metadata("demo").await.is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_on_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let tier = FileTier::new(temp_dir.path().join("absent"));
        assert!(tier.namespaces().await.is_empty());
    }
}
