//! Cache storage trait and usage statistics.
//!
//! This module defines the trait that must be implemented by cache storage
//! backends holding versioned stores of request/response pairs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_core::{LarderResult, RequestIdentity, ResponseSnapshot, StoreName};

/// Pluggable cache storage holding named, versioned stores.
///
/// This trait abstracts over different backends (in-memory, LMDB).
/// Implementations should be thread-safe and support concurrent access.
///
/// # Atomicity
///
/// Implementations must provide atomic per-key put/get/delete; the worker
/// layers no additional locking on top of that.
///
/// # Missing stores
///
/// Reads (`get`) against an absent store are a plain miss (`Ok(None)`).
/// Writes (`put`) and introspection (`keys`) against an absent store are an
/// error: a store must be opened before it can hold entries.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent. Idempotent.
    async fn open(&self, store: &StoreName) -> LarderResult<()>;

    /// Whether a store with this name exists.
    async fn has(&self, store: &StoreName) -> LarderResult<bool>;

    /// Names of all stores currently present.
    async fn store_names(&self) -> LarderResult<Vec<StoreName>>;

    /// Delete a store and every entry in it. Returns whether it existed.
    async fn delete_store(&self, store: &StoreName) -> LarderResult<bool>;

    /// Look up a stored response by request identity.
    ///
    /// Returns the snapshot and when it was cached, or None if not found.
    async fn get(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
    ) -> LarderResult<Option<(ResponseSnapshot, DateTime<Utc>)>>;

    /// Store a response snapshot, overwriting any prior entry for the
    /// identity.
    ///
    /// The `cached_at` timestamp is stored alongside the snapshot.
    async fn put(
        &self,
        store: &StoreName,
        identity: &RequestIdentity,
        snapshot: &ResponseSnapshot,
        cached_at: DateTime<Utc>,
    ) -> LarderResult<()>;

    /// Entry keys (identity key strings) present in a store.
    async fn keys(&self, store: &StoreName) -> LarderResult<Vec<String>>;

    /// Get cache statistics.
    async fn stats(&self) -> LarderResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently stored, across all stores.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
