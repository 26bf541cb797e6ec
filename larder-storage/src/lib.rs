//! LARDER Storage - Cache Store Trait and Implementations
//!
//! Defines the cache storage abstraction for the offline worker: named,
//! versioned stores mapping request identity to a stored response snapshot.
//! Ships an in-memory backend and an LMDB-backed persistent backend.
//!
//! # Design Notes
//!
//! Stores are superseded, never mutated in place, on redeploy: a new
//! deployment owns a new version-qualified store name, and stale stores are
//! deleted wholesale at activation. The trait therefore exposes store-level
//! enumeration and deletion alongside per-entry get/put.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

mod key;

pub use lmdb_backend::{LmdbCacheStorage, LmdbStorageError};
pub use memory::MemoryCacheStorage;
pub use traits::{CacheStats, CacheStorage};
