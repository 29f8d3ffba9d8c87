//! Practice Cache - local cache for practice-question fetchers
//!
//! Two-tier caching (memory + JSON files) with TTL expiration, byte-bounded
//! memory eviction and namespace-scoped invalidation.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStore, GetOptions, SetOptions};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
