//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check expiration, eviction, round-trip and isolation
//! properties of the two tiers.

use proptest::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::cache::{derive_key, CacheEntry, CacheStore, MemoryTier, MetadataRecord};
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_TTL_MS: u64 = 60_000;

// == Strategies ==
/// Generates namespace names
fn namespace_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(|s| s)
}

/// Generates fetcher identifiers
fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:/ -]{1,64}".prop_map(|s| s)
}

/// Generates JSON payloads without floats (exact round-trip)
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

async fn open_store(temp_dir: &TempDir) -> CacheStore {
    CacheStore::open(CacheConfig::with_dir(temp_dir.path().join("cache")))
        .await
        .expect("open should succeed")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Expiration depends only on timestamp and ttl: valid through t0 + ttl,
    // expired strictly after, and the same answer from entries and records.
    #[test]
    fn prop_expiration_is_pure(
        t0 in 0u64..1_000_000_000,
        ttl in 0u64..10_000_000,
        offset in 0u64..20_000_000,
    ) {
        let entry = CacheEntry::with_timestamp("ns_k", Value::Null, ttl, t0);
        let record = MetadataRecord {
            key: "ns_k".to_string(),
            timestamp: t0,
            ttl,
            size: 0,
            fingerprint: String::new(),
            accessed: t0,
        };
        let now = t0 + offset;

        prop_assert_eq!(entry.is_expired_at(now), offset > ttl);
        prop_assert_eq!(record.is_expired_at(now), entry.is_expired_at(now));
    }

    // Running size never stays above the budget once an insert returns, and
    // always equals the sum of resident entry sizes.
    #[test]
    fn prop_eviction_bound(
        sizes in prop::collection::vec(2usize..400, 1..80),
        max_size in 50u64..2_000,
    ) {
        let mut tier = MemoryTier::new(max_size);
        let mut keys = Vec::new();

        for (i, size) in sizes.iter().enumerate() {
            let key = format!("ns_{}", i);
            let entry = CacheEntry::with_timestamp(
                key.clone(),
                json!("x".repeat(size - 2)),
                TEST_TTL_MS,
                i as u64,
            );
            tier.insert(entry);
            keys.push(key);

            prop_assert!(
                tier.current_size() <= max_size,
                "size {} exceeds budget {}",
                tier.current_size(),
                max_size
            );
            let resident: u64 = keys
                .iter()
                .filter_map(|k| tier.lookup(k))
                .map(|e| e.size)
                .sum();
            prop_assert_eq!(resident, tier.current_size());
        }
    }

    // Derived keys are deterministic and carry the namespace prefix.
    #[test]
    fn prop_key_derivation_stable(
        namespace in namespace_strategy(),
        identifier in identifier_strategy(),
    ) {
        let key = derive_key(&namespace, &identifier);
        let prefix = format!("{}_", namespace);
        prop_assert_eq!(&key, &derive_key(&namespace, &identifier));
        prop_assert!(key.starts_with(&prefix));
        prop_assert_eq!(key.len(), namespace.len() + 1 + 32);
    }
}

// Filesystem-backed properties run fewer cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // A set followed by a get returns a deep-equal payload, both from memory
    // and from disk after a restart.
    #[test]
    fn prop_roundtrip(
        identifier in identifier_strategy(),
        data in json_strategy(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let (from_memory, from_disk) = runtime().block_on(async {
            let store = open_store(&temp_dir).await;
            store.set("coding-problems", &identifier, &data).await;
            let from_memory: Option<Value> = store.get("coding-problems", &identifier).await;

            let reopened = open_store(&temp_dir).await;
            let from_disk: Option<Value> = reopened.get("coding-problems", &identifier).await;
            (from_memory, from_disk)
        });

        prop_assert_eq!(from_memory.as_ref(), Some(&data));
        prop_assert_eq!(from_disk.as_ref(), Some(&data));
    }

    // Invalidating one namespace leaves the same identifiers in another
    // namespace untouched.
    #[test]
    fn prop_namespace_isolation(
        identifiers in prop::collection::btree_set(identifier_strategy(), 1..6),
    ) {
        let temp_dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let store = open_store(&temp_dir).await;
            for id in &identifiers {
                store.set("companies", id, &format!("companies:{}", id)).await;
                store.set("coding-problems", id, &format!("problems:{}", id)).await;
            }

            store.invalidate("companies", None).await;

            let status = store.status(None).await;
            assert_eq!(status.namespaces["companies"].total_entries, 0);
            assert_eq!(status.namespaces["coding-problems"].total_entries, identifiers.len());
            assert_eq!(status.memory_cache.entries, identifiers.len());

            for id in &identifiers {
                assert!(store.get::<String>("companies", id).await.is_none());
                assert_eq!(
                    store.get::<String>("coding-problems", id).await,
                    Some(format!("problems:{}", id))
                );
            }
        });
    }
}
