//! Key Derivation Module
//!
//! Turns `(namespace, identifier)` pairs into stable cache keys and computes
//! content fingerprints of payloads.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Literal written in place of a container revisited during its own walk
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// Fingerprint recorded when a payload cannot be serialized
pub const FINGERPRINT_ERROR: &str = "serialization-error";

/// Number of digest bytes kept in a derived key (128 bits)
const KEY_DIGEST_BYTES: usize = 16;

// == Derive Key ==
/// Derives the cache key for an identifier within a namespace.
///
/// The key is `"{namespace}_{hex}"` where `hex` is the first 128 bits of the
/// SHA-256 digest of `identifier`. Stable across process runs.
pub fn derive_key(namespace: &str, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    let hash = hex::encode(&hasher.finalize()[..KEY_DIGEST_BYTES]);
    format!("{}_{}", namespace, hash)
}

/// True if `key` was derived by [`derive_key`] under exactly `namespace`.
///
/// A bare prefix test is not enough: keys of `demo_x` also start with `demo_`.
pub(crate) fn key_in_namespace(key: &str, namespace: &str) -> bool {
    match key
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('_'))
    {
        Some(hash) => {
            hash.len() == KEY_DIGEST_BYTES * 2 && hash.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

// == Fingerprint ==
/// Hashes the JSON serialization of `data`.
///
/// Never fails: serializer errors produce [`FINGERPRINT_ERROR`], and cyclic
/// [`Shared`] graphs serialize with [`CIRCULAR_MARKER`] in place of the cycle.
pub fn fingerprint<T: Serialize + ?Sized>(data: &T) -> String {
    match serde_json::to_vec(data) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        }
        Err(_) => FINGERPRINT_ERROR.to_string(),
    }
}

thread_local! {
    // Addresses of `Shared` handles currently being serialized on this thread.
    static IN_PROGRESS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Removes an address from the in-progress set when its walk finishes.
struct WalkGuard(usize);

impl Drop for WalkGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|p| {
            p.borrow_mut().remove(&self.0);
        });
    }
}

// == Shared Handle ==
/// Reference-counted, mutable handle for payloads that may refer to themselves.
///
/// Cloning shares the same allocation. Serializing a handle that is already
/// being serialized further up the stack emits [`CIRCULAR_MARKER`] instead of
/// recursing, so self-referential graphs can be cached and fingerprinted.
/// Handles are `Send + Sync` for `T: Send`, so caching one works from any
/// tokio task. Do not hold [`lock`](Self::lock) across a `set` of the same
/// graph.
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Locks the value. A poisoned lock still yields the value.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Ok(value) => f.debug_tuple("Shared").field(&*value).finish(),
            Err(TryLockError::Poisoned(poisoned)) => {
                f.debug_tuple("Shared").field(&*poisoned.into_inner()).finish()
            }
            Err(TryLockError::WouldBlock) => f.write_str("Shared(<locked>)"),
        }
    }
}

impl<T: Serialize> Serialize for Shared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let addr = self.addr();
        let entered = IN_PROGRESS.with(|p| p.borrow_mut().insert(addr));
        if !entered {
            return serializer.serialize_str(CIRCULAR_MARKER);
        }
        let _guard = WalkGuard(addr);

        // a revisit on this thread returned above, so this never re-enters
        self.lock().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Shared<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Shared::new)
    }
}
